use crust::{CheckPolicy, HarnessConfiguration, LoadProfile, LoadRunner, Runner};
use jwt_pizza_load::pizza;
use log::info;
use std::{env, sync::Arc, time::Duration};

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| String::from(default))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut arguments = env::args().skip(1);
    let once = env::args().any(|argument| argument == "--once");
    let service_url = arguments
        .find(|argument| argument != "--once")
        .unwrap_or_else(|| env_or("PIZZA_SERVICE_URL", "https://pizza-service.jwt-pizza.click"));

    let mut configuration = HarnessConfiguration::new(CheckPolicy::FailSoft);
    configuration.set_variable(
        "front_url",
        env_or("PIZZA_FRONT_URL", "https://pizza.jwt-pizza.click"),
    );
    configuration.set_variable("api_url", service_url);
    configuration.set_variable(
        "factory_url",
        env_or("PIZZA_FACTORY_URL", "https://pizza-factory.cs329.click"),
    );

    let scenario = Arc::new(pizza::login_and_order());

    if once {
        let report = Runner::new(configuration).run(&scenario).await;
        if let Ok(text) = serde_json::to_string_pretty(&report) {
            println!("{}", text);
        }
        if let Some(failure) = &report.failure {
            eprintln!("iteration failed: {}", failure);
            std::process::exit(1);
        }
        return;
    }

    // the recorded ramping-vus schedule: up to 20 vus over a minute, hold for
    // 3m30s, ramp down over a minute
    let profile = LoadProfile::new()
        .stage(20, Duration::from_secs(60))
        .stage(20, Duration::from_secs(210))
        .stage(0, Duration::from_secs(60))
        .graceful_stop(Duration::from_secs(30));

    match LoadRunner::new(configuration).execute(&profile, scenario).await {
        Ok(summary) => {
            info!(
                "load run finished: {} iterations, {} passed, {} failed, peak {} vus",
                summary.iterations, summary.passed, summary.failed, summary.peak_vus
            );
            if let Ok(text) = serde_json::to_string_pretty(&summary) {
                println!("{}", text);
            }
        }
        Err(e) => {
            eprintln!("load run failed: {}", e);
            std::process::exit(1);
        }
    }
}
