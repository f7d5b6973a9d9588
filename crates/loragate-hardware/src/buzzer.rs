//! Buzzer feedback patterns.
//!
//! A pattern is a fixed sequence of pin levels, each held for a duration.
//! [`Buzzer`] plays patterns on any [`OutputPin`]. The pin is driven low on
//! first use, so a buzzer never starts in an undefined state.
//!
//! | Pattern | Sequence |
//! |---------|----------|
//! | `short` | high 80 ms, low |
//! | `double` | 2 x (high 80 ms, low 60 ms) |
//! | `long` | high 300 ms, low |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::{OutputPin, PinLevel};

/// One step of a pattern: drive the pin to `level`, then wait `hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStep {
    pub level: PinLevel,
    pub hold: Duration,
}

impl PinStep {
    const fn new(level: PinLevel, hold_ms: u64) -> Self {
        Self {
            level,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

const SHORT: &[PinStep] = &[PinStep::new(PinLevel::High, 80), PinStep::new(PinLevel::Low, 0)];

const DOUBLE: &[PinStep] = &[
    PinStep::new(PinLevel::High, 80),
    PinStep::new(PinLevel::Low, 60),
    PinStep::new(PinLevel::High, 80),
    PinStep::new(PinLevel::Low, 60),
];

const LONG: &[PinStep] = &[PinStep::new(PinLevel::High, 300), PinStep::new(PinLevel::Low, 0)];

/// Audible feedback pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuzzerPattern {
    #[default]
    Short,
    Double,
    Long,
}

impl BuzzerPattern {
    pub fn name(&self) -> &'static str {
        match self {
            BuzzerPattern::Short => "short",
            BuzzerPattern::Double => "double",
            BuzzerPattern::Long => "long",
        }
    }

    /// Pin sequence for this pattern. Always ends low.
    pub fn steps(&self) -> &'static [PinStep] {
        match self {
            BuzzerPattern::Short => SHORT,
            BuzzerPattern::Double => DOUBLE,
            BuzzerPattern::Long => LONG,
        }
    }

    /// Total time the pattern takes to play.
    pub fn duration(&self) -> Duration {
        self.steps().iter().map(|step| step.hold).sum()
    }
}

impl fmt::Display for BuzzerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuzzerPattern {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(BuzzerPattern::Short),
            "double" => Ok(BuzzerPattern::Double),
            "long" => Ok(BuzzerPattern::Long),
            other => Err(TransportError::other(format!(
                "Unknown buzzer pattern '{other}'"
            ))),
        }
    }
}

/// Buzzer on an output pin.
#[derive(Debug)]
pub struct Buzzer<P: OutputPin> {
    pin: P,
    ready: bool,
}

impl<P: OutputPin> Buzzer<P> {
    /// Wrap a pin. The pin is not touched until [`init`](Buzzer::init) or the
    /// first [`play`](Buzzer::play).
    pub fn new(pin: P) -> Self {
        Self { pin, ready: false }
    }

    /// Drive the pin low and mark the buzzer ready. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the pin error if the pin cannot be driven.
    pub async fn init(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }

        self.pin.set_level(PinLevel::Low).await?;
        self.ready = true;
        tracing::debug!("Buzzer initialized");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Play a pattern, initializing the pin first if needed.
    ///
    /// # Errors
    ///
    /// Returns the pin error; the pin is left in whatever state the failing
    /// step produced.
    pub async fn play(&mut self, pattern: BuzzerPattern) -> Result<()> {
        self.init().await?;

        for step in pattern.steps() {
            self.pin.set_level(step.level).await?;
            if !step.hold.is_zero() {
                tokio::time::sleep(step.hold).await;
            }
        }

        tracing::debug!(pattern = %pattern, "Buzzer pattern played");
        Ok(())
    }

    /// Give the pin back.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPin;
    use rstest::rstest;

    #[rstest]
    #[case("short", BuzzerPattern::Short)]
    #[case("DOUBLE", BuzzerPattern::Double)]
    #[case(" long ", BuzzerPattern::Long)]
    fn test_pattern_from_str(#[case] input: &str, #[case] expected: BuzzerPattern) {
        assert_eq!(input.parse::<BuzzerPattern>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_pattern_rejected() {
        assert!("triple".parse::<BuzzerPattern>().is_err());
    }

    #[rstest]
    #[case(BuzzerPattern::Short, 80)]
    #[case(BuzzerPattern::Double, 280)]
    #[case(BuzzerPattern::Long, 300)]
    fn test_pattern_duration(#[case] pattern: BuzzerPattern, #[case] millis: u64) {
        assert_eq!(pattern.duration(), Duration::from_millis(millis));
    }

    #[rstest]
    #[case(BuzzerPattern::Short)]
    #[case(BuzzerPattern::Double)]
    #[case(BuzzerPattern::Long)]
    fn test_patterns_end_low(#[case] pattern: BuzzerPattern) {
        assert_eq!(pattern.steps().last().map(|s| s.level), Some(PinLevel::Low));
        assert_eq!(pattern.steps().first().map(|s| s.level), Some(PinLevel::High));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_initializes_then_toggles() {
        let pin = MockPin::new();
        let mut buzzer = Buzzer::new(pin.clone());
        assert!(!buzzer.is_ready());

        buzzer.play(BuzzerPattern::Double).await.unwrap();

        assert!(buzzer.is_ready());
        assert_eq!(
            pin.levels(),
            vec![
                PinLevel::Low, // init
                PinLevel::High,
                PinLevel::Low,
                PinLevel::High,
                PinLevel::Low,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_is_idempotent() {
        let pin = MockPin::new();
        let mut buzzer = Buzzer::new(pin.clone());

        buzzer.init().await.unwrap();
        buzzer.init().await.unwrap();
        buzzer.play(BuzzerPattern::Short).await.unwrap();

        assert_eq!(pin.levels(), vec![PinLevel::Low, PinLevel::High, PinLevel::Low]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_takes_pattern_duration() {
        let mut buzzer = Buzzer::new(MockPin::new());
        let start = tokio::time::Instant::now();

        buzzer.play(BuzzerPattern::Long).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_pin_leaves_buzzer_not_ready() {
        let pin = MockPin::new();
        pin.fail_next();
        let mut buzzer = Buzzer::new(pin.clone());

        assert!(buzzer.play(BuzzerPattern::Short).await.is_err());
        assert!(!buzzer.is_ready());

        // Next attempt succeeds
        buzzer.play(BuzzerPattern::Short).await.unwrap();
        assert!(buzzer.is_ready());
    }
}
