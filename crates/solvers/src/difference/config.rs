use thiserror::Error;

/// Run options for the difference stepper.
///
/// The time passed to the update function at step `i` is `t0 + dt * i`. It
/// is only a convenience clock; the recurrence itself is defined over integer
/// steps.
///
/// # Example
///
/// ```
/// use difeq_solvers::difference::Config;
///
/// let config = Config::new(0.0, 0.25)
///     .unwrap()
///     .include_initial(false)
///     .return_history(true);
///
/// assert!(!config.includes_initial());
/// assert!(config.returns_history());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawConfig", into = "RawConfig"))]
pub struct Config {
    t0: f64,
    dt: f64,
    include_initial: bool,
    return_history: bool,
    retain_initial: bool,
}

/// Errors that can occur when validating a difference stepper config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("t0 must be finite")]
    T0,

    #[error("dt must be finite")]
    Dt,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            t0: 0.0,
            dt: 1.0,
            include_initial: true,
            return_history: false,
            retain_initial: true,
        }
    }
}

impl Config {
    /// Creates a config with the given clock and default flags.
    ///
    /// # Errors
    ///
    /// Returns an error if `t0` or `dt` is not finite.
    pub fn new(t0: f64, dt: f64) -> Result<Self, ConfigError> {
        if !t0.is_finite() {
            return Err(ConfigError::T0);
        }
        if !dt.is_finite() {
            return Err(ConfigError::Dt);
        }

        Ok(Self {
            t0,
            dt,
            ..Self::default()
        })
    }

    /// Sets whether the initial condition is the first output row.
    #[must_use]
    pub fn include_initial(mut self, include: bool) -> Self {
        self.include_initial = include;
        self
    }

    /// Sets whether the solution carries a drained copy of the history.
    #[must_use]
    pub fn return_history(mut self, enabled: bool) -> Self {
        self.return_history = enabled;
        self
    }

    /// Sets whether the initial condition is stored in the history.
    ///
    /// When disabled, the first retained step is the one after the initial
    /// condition, and lag queries cannot see the initial state.
    #[must_use]
    pub fn retain_initial(mut self, retain: bool) -> Self {
        self.retain_initial = retain;
        self
    }

    /// Returns the time at step 0.
    #[must_use]
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Returns the time increment per step.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the time at `step`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_at(&self, step: usize) -> f64 {
        self.t0 + self.dt * step as f64
    }

    /// Returns `true` if the initial condition is the first output row.
    #[must_use]
    pub fn includes_initial(&self) -> bool {
        self.include_initial
    }

    /// Returns `true` if the solution carries a drained copy of the history.
    #[must_use]
    pub fn returns_history(&self) -> bool {
        self.return_history
    }

    /// Returns `true` if the initial condition is stored in the history.
    #[must_use]
    pub fn retains_initial(&self) -> bool {
        self.retain_initial
    }
}

/// Serialized form of [`Config`], validated on the way in.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct RawConfig {
    t0: f64,
    dt: f64,
    include_initial: bool,
    return_history: bool,
    retain_initial: bool,
}

#[cfg(feature = "serde")]
impl Default for RawConfig {
    fn default() -> Self {
        Config::default().into()
    }
}

#[cfg(feature = "serde")]
impl From<Config> for RawConfig {
    fn from(config: Config) -> Self {
        Self {
            t0: config.t0,
            dt: config.dt,
            include_initial: config.include_initial,
            return_history: config.return_history,
            retain_initial: config.retain_initial,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Ok(Config::new(raw.t0, raw.dt)?
            .include_initial(raw.include_initial)
            .return_history(raw.return_history)
            .retain_initial(raw.retain_initial))
    }
}
