use log::error;
use rusoto_ec2::Ec2Client;

mod config;
mod logging;
mod runtime;
mod stopper;
mod util;

use config::StopperConfig;
use runtime::{InvocationContext, RuntimeClient};

fn setup() -> anyhow::Result<(StopperConfig, Ec2Client)> {
    let config = StopperConfig::from_env()?;
    let client = stopper::build_client(&config)?;

    Ok((config, client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let runtime = RuntimeClient::from_env().transpose()?;

    let (config, client) = match setup() {
        Ok(setup) => setup,
        Err(err) => {
            error!("failed to start: {:#}", err);
            if let Some(runtime) = &runtime {
                runtime.send_init_error(&err).await?;
            }
            return Err(err);
        }
    };

    match runtime {
        Some(runtime) => {
            let client = &client;
            let config = &config;
            runtime::run(&runtime, move |event, context| async move {
                stopper::handle(client, config, &event, &context).await
            })
            .await?;
        }
        None => {
            // Outside the function platform: one invocation, then exit.
            let event = serde_json::Value::Null;
            if let Err(err) =
                stopper::handle(&client, &config, &event, &InvocationContext::local()).await
            {
                error!("invocation failed: {:#}", err);
                return Err(err);
            }
        }
    }

    Ok(())
}
