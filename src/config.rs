use std::env;

/// Tunable circulation policy. Every mutating service receives one of these
/// so tests can pin values without touching the process environment.
#[derive(Debug, Clone)]
pub struct CirculationConfig {
    /// Days until a new loan falls due.
    pub loan_period_days: i64,
    /// Currency units charged per whole day a return is late.
    pub daily_fine_rate: f64,
    /// Days until an unactioned reservation expires.
    pub reservation_expiry_days: i64,
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            loan_period_days: 14,
            daily_fine_rate: 1.50,
            reservation_expiry_days: 2,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub circulation: CirculationConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://bibliocirc.db?mode=rwc".to_string());

        let defaults = CirculationConfig::default();

        Self {
            database_url,
            circulation: CirculationConfig {
                loan_period_days: env::var("LOAN_PERIOD_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.loan_period_days),
                daily_fine_rate: env::var("DAILY_FINE_RATE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.daily_fine_rate),
                reservation_expiry_days: env::var("RESERVATION_EXPIRY_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.reservation_expiry_days),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_env_unset() {
        unsafe {
            env::remove_var("LOAN_PERIOD_DAYS");
            env::remove_var("DAILY_FINE_RATE");
            env::remove_var("RESERVATION_EXPIRY_DAYS");
        }

        let config = Config::from_env();
        assert_eq!(config.circulation.loan_period_days, 14);
        assert_eq!(config.circulation.daily_fine_rate, 1.50);
        assert_eq!(config.circulation.reservation_expiry_days, 2);
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        unsafe {
            env::set_var("LOAN_PERIOD_DAYS", "21");
            env::set_var("DAILY_FINE_RATE", "0.75");
            env::set_var("RESERVATION_EXPIRY_DAYS", "7");
        }

        let config = Config::from_env();
        assert_eq!(config.circulation.loan_period_days, 21);
        assert_eq!(config.circulation.daily_fine_rate, 0.75);
        assert_eq!(config.circulation.reservation_expiry_days, 7);

        unsafe {
            env::remove_var("LOAN_PERIOD_DAYS");
            env::remove_var("DAILY_FINE_RATE");
            env::remove_var("RESERVATION_EXPIRY_DAYS");
        }
    }
}
