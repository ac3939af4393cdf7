use std::process::ExitCode;

use barcast_core::{AppError, Config, ConfigError};
use barcast_weather::{
    ensure_cache_dir, BarOutput, ForecastService, Formatter, IpApiClient, LocationResolver,
    ResolverConfig, WeatherProvider,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = barcast_core::init() {
        eprintln!("barcast: {e:#}");
    }

    let config = match Config::load_validated() {
        Ok((config, _)) => config,
        Err(e) => {
            let err = AppError::from(e);
            tracing::error!("{}", err);
            barcast_core::notify_user(&startup_failure_message(&err));
            return ExitCode::FAILURE;
        }
    };

    let output = match run(&config).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("Weather service error: {}", e);
            BarOutput::error(&e)
        }
    };

    println!("{}", output.to_json_line());
    ExitCode::SUCCESS
}

async fn run(config: &Config) -> Result<BarOutput, AppError> {
    if let Err(e) = ensure_cache_dir(&config.cache_dir) {
        tracing::warn!(
            "Cannot create cache directory {}: {}",
            config.cache_dir.display(),
            e
        );
    }

    let fetcher = IpApiClient::new(config.location.endpoint.as_str(), config.http_timeout())?;
    let resolver = LocationResolver::new(fetcher, ResolverConfig::from_config(config));

    let Some(location) = resolver.resolve_location().await else {
        return Ok(BarOutput::location_unavailable());
    };

    let provider = WeatherProvider::new(
        config.weather.endpoint.as_str(),
        config.api_key.as_str(),
        config.weather.forecast_days,
        config.http_timeout(),
    )?;
    let forecasts = ForecastService::new(
        provider,
        &config.cache_dir,
        config.weather.cache_duration(),
    );
    let formatter = Formatter::new(config.weather.temperature_unit);

    match forecasts.forecast(&location).await {
        Ok(payload) => {
            let now = chrono::Local::now().naive_local();
            Ok(formatter.format(Some(&location), Some(&payload), now))
        }
        Err(e) => {
            let e = AppError::from(e);
            Ok(BarOutput::weather_unavailable(Some(e.user_message())))
        }
    }
}

fn startup_failure_message(err: &AppError) -> String {
    match err {
        AppError::Config(ConfigError::MissingSetting(_)) => {
            "Weather API key not set. Please set WEATHER_API_KEY in barcast's .env file.".to_string()
        }
        other => other.user_message().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_notification_names_the_variable() {
        let err = AppError::from(ConfigError::MissingSetting("WEATHER_API_KEY".into()));
        assert!(startup_failure_message(&err).contains("WEATHER_API_KEY"));
    }

    #[test]
    fn test_other_startup_failures_use_user_message() {
        let err = AppError::from(ConfigError::ParseError("expected `]`".into()));
        assert_eq!(startup_failure_message(&err), err.user_message());
    }
}
