use std::process;
use std::time::Duration;

use clap::Parser as _;
use node_problem_client::NodeProblemClient;
use node_problem_client::ProblemClient as _;
use node_problem_client::eventf;
use node_problem_ext as k8s;

use k8s::TimeExt as _;
use k8s::metav1;

use cli::Cli;
use cli::Command;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = NodeProblemClient::new(&cli.options()).unwrap_or_else(|err| {
        tracing::error!(%err, "Failed to create node problem client");
        eprintln!("node-problem-agent: {err}");
        process::exit(1)
    });
    tracing::info!(node = client.node_name(), "Starting node-problem-agent");

    match cli.command {
        Command::GetConditions { types } => {
            let types = types.iter().map(String::as_str).collect::<Vec<_>>();
            let conditions = client.get_conditions(&types).await?;
            println!("{}", serde_json::to_string_pretty(&conditions)?);
        }
        Command::SetCondition(args) => {
            let mut conditions = [args.condition(metav1::Time::now())];
            client.set_conditions(&mut conditions).await?;
            tracing::info!(
                condition = args.type_.as_str(),
                status = args.status.as_str(),
                "Condition updated"
            );
        }
        Command::Event(args) => {
            eventf!(
                client,
                args.event_type,
                &args.source,
                &args.reason,
                "{}",
                args.message
            );
            // Delivery runs on the broadcaster task; give it a chance before exit.
            tokio::time::sleep(Duration::from_secs(args.linger)).await;
        }
    }

    Ok(())
}
