pub mod cli;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells::Bash};
use env_logger::TimestampPrecision;
use log::error;

use scales_lib::{ScalesDriver, Unit, Weight};

use cli::{Cli, Command};

fn weight_to_json(weight: &Weight) -> json::JsonValue {
    let mut obj = json::JsonValue::new_object();
    obj["value"] = weight.value.into();
    obj["unit"] = weight.unit.symbol().into();
    obj["stable"] = weight.stable.into();
    obj["overload"] = weight.is_overload().into();
    obj["underload"] = weight.is_underload().into();
    obj
}

async fn cmd_weight(
    driver: &mut ScalesDriver,
    unit: Unit,
    count: usize,
    interval: u64,
    as_json: bool,
) -> Result<()> {
    let polling = count != 1;
    let mut done = 0usize;

    loop {
        match driver.get_weight(unit).await {
            Ok(weight) if as_json => println!("{}", json::stringify(weight_to_json(&weight))),
            Ok(weight) => println!("{}: {}", driver, weight),
            // Keep polling; the connector reopens the transport on the next call.
            Err(e) if polling => error!("{}. {}. {:#}", driver, driver.connector(), e),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read weight from {}", driver))
            }
        }

        done += 1;
        if count != 0 && done >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(interval)).await;
    }

    driver.close().await;
    Ok(())
}

async fn cmd_info(driver: &mut ScalesDriver, as_json: bool) -> Result<()> {
    let info = driver
        .get_info()
        .await
        .with_context(|| format!("Failed to read info from {}", driver))?;
    driver.close().await;

    if as_json {
        println!("{}", json::stringify(info));
    } else {
        println!("{}", info);
    }
    Ok(())
}

async fn do_main() -> Result<()> {
    let args = Cli::parse();

    if let Command::Completions = args.command {
        generate(Bash, &mut Cli::command(), "scales-tool", &mut io::stdout());
        return Ok(());
    }

    let mut driver = ScalesDriver::from_params(
        &args.name,
        args.protocol,
        &args.connection.to_string(),
        args.timeout,
        &args.connection_params(),
    )
    .context("Invalid connection settings")?;

    match args.command {
        Command::Weight {
            unit,
            count,
            interval,
        } => cmd_weight(&mut driver, unit, count, interval, args.json).await,
        Command::Info => cmd_info(&mut driver, args.json).await,
        Command::Completions => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .format_target(false)
        .init();

    if let Err(e) = do_main().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
