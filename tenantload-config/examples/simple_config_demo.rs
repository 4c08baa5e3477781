//! Print the resolved run plan for the current environment
//!
//! ```sh
//! TENANTS=T1001,T1002 USERS_MAP=T1001=3 RATE=high cargo run -p tenantload-config --example simple_config_demo
//! ```

use tenantload_config::{ConfigLoader, LoadConfig};

fn main() {
    let config = match ConfigLoader::new().from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match config.run_plan() {
        Ok(plan) => {
            for run in plan {
                println!(
                    "{:<12} users={:<3} interval={}",
                    run.tenant,
                    run.user_count,
                    humantime::format_duration(run.pacing_interval)
                );
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("\nSample configuration:\n{}", LoadConfig::generate_sample());
        }
    }
}
