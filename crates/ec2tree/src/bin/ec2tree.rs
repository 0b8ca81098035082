//! ec2tree CLI - provision a tree of EC2 instances, tear it down on Ctrl+C.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ec2tree::config::{
    DEFAULT_FANOUT, DEFAULT_IMAGE_ID, DEFAULT_INSTANCE_TYPE, DEFAULT_MAX_DEPTH, DEFAULT_REGION,
};
use ec2tree::providers::aws::{AwsCredentials, Ec2};
use ec2tree::{BuildError, Node, TreeConfig, TreeService};

/// ec2tree CLI - a tree of EC2 instances with one key pair per node.
#[derive(Parser)]
#[command(name = "ec2tree")]
#[command(about = "Provision a tree of EC2 instances and delete it on Ctrl+C")]
struct Cli {
    /// AMI every node boots from.
    #[arg(long, env = "EC2TREE_IMAGE_ID", default_value = DEFAULT_IMAGE_ID)]
    image_id: String,

    /// Instance type of every node.
    #[arg(long, env = "EC2TREE_INSTANCE_TYPE", default_value = DEFAULT_INSTANCE_TYPE)]
    instance_type: String,

    /// AWS region.
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Levels below the root.
    #[arg(long, env = "EC2TREE_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Children per internal node.
    #[arg(long, env = "EC2TREE_FANOUT", default_value_t = DEFAULT_FANOUT)]
    fanout: u32,

    /// Override the EC2 endpoint (e.g. `http://localhost:4566` for `LocalStack`).
    #[arg(long, env = "EC2TREE_ENDPOINT")]
    endpoint: Option<String>,

    /// AWS access key ID (or set `AWS_ACCESS_KEY_ID` env var).
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: String,

    /// AWS secret access key (or set `AWS_SECRET_ACCESS_KEY` env var).
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,

    /// AWS session token for temporary credentials.
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// How to print the provisioned tree.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Instance ID lines plus an indented tree.
    Text,
    /// The tree as pretty JSON.
    Json,
}

impl Cli {
    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            image_id: self.image_id.clone(),
            instance_type: self.instance_type.clone(),
            region: self.region.clone(),
            max_depth: self.max_depth,
            fanout: self.fanout,
        }
    }

    fn credentials(&self) -> AwsCredentials {
        let credentials = AwsCredentials::new(&self.access_key_id, &self.secret_access_key);
        match &self.session_token {
            Some(token) => credentials.with_session_token(token),
            None => credentials,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.tree_config();

    let mut ec2 =
        Ec2::new(cli.credentials(), &config.region).context("Failed to create EC2 client")?;
    if let Some(endpoint) = &cli.endpoint {
        ec2 = ec2.with_endpoint(endpoint)?;
        info!(endpoint = %endpoint, "Using custom EC2 endpoint");
    }

    let service = TreeService::new(ec2, config).context("Invalid tree configuration")?;

    let root = match service.create_tree().await {
        Ok(root) => root,
        Err(err) => {
            report_orphans(&err);
            return Err(err).context("Failed to create tree");
        }
    };

    print_tree(&root, cli.output)?;

    println!("\nPress Ctrl+C to delete the tree");
    shutdown_signal().await?;

    service
        .delete_tree(&root)
        .await
        .context("Failed to delete tree")?;

    println!("cleaned up tree");
    Ok(())
}

fn print_tree(root: &Node, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => {
            println!("Root instance ID: {}", root.instance.id);
            for node in root.iter().skip(1) {
                println!("{} instance ID: {}", node.key_pair.name, node.instance.id);
            }
            println!("\n{}", root.render());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(root).context("Failed to serialize tree")?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Print everything a failed build left behind.
fn report_orphans(err: &BuildError) {
    error!(position = %err.position, step = %err.step, "Tree creation failed");

    if let Some(partial) = err.partial() {
        warn!(
            nodes = partial.node_count(),
            "Resources below were created and are still live"
        );
        println!("\nOrphaned resources:");
        for node in partial {
            println!(
                "  instance {}  key pair {}",
                node.instance.id, node.key_pair.name
            );
        }
    }

    if let Some(key) = err.orphaned_key() {
        if err.partial().is_none() {
            println!("\nOrphaned resources:");
        }
        println!("  key pair {key} (instance launch failed)");
    }
}

async fn shutdown_signal() -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            res = ctrl_c => {
                res.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, deleting tree");
            },
            _ = terminate.recv() => {
                info!("Received SIGTERM, deleting tree");
            },
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, deleting tree");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn argument<'a>(cmd: &'a clap::Command, id: &str) -> &'a clap::Arg {
        cmd.get_arguments()
            .find(|arg| arg.get_id() == id)
            .unwrap_or_else(|| panic!("no argument {id}"))
    }

    fn default_value(cmd: &clap::Command, id: &str) -> String {
        argument(cmd, id)
            .get_default_values()
            .first()
            .and_then(|v| v.to_str())
            .unwrap_or_else(|| panic!("{id} has no default"))
            .to_string()
    }

    fn env_name(cmd: &clap::Command, id: &str) -> Option<String> {
        argument(cmd, id)
            .get_env()
            .and_then(|v| v.to_str())
            .map(str::to_string)
    }

    #[test]
    fn test_defaults_match_fixed_configuration() {
        let cmd = Cli::command();
        let config = TreeConfig::default();

        let cases = [
            ("image_id", config.image_id, "EC2TREE_IMAGE_ID"),
            ("instance_type", config.instance_type, "EC2TREE_INSTANCE_TYPE"),
            ("region", config.region, "AWS_REGION"),
            ("max_depth", config.max_depth.to_string(), "EC2TREE_MAX_DEPTH"),
            ("fanout", config.fanout.to_string(), "EC2TREE_FANOUT"),
        ];

        for (id, default, env) in cases {
            assert_eq!(default_value(&cmd, id), default, "{id}");
            assert_eq!(env_name(&cmd, id).as_deref(), Some(env), "{id}");
        }

        assert_eq!(default_value(&cmd, "output"), "text");
        assert!(argument(&cmd, "endpoint").get_default_values().is_empty());
    }

    #[test]
    fn test_env_overrides_default() {
        // no other test in this binary reads this variable
        std::env::set_var("EC2TREE_INSTANCE_TYPE", "t4g.micro");
        let parsed = Cli::try_parse_from([
            "ec2tree",
            "--access-key-id",
            "AKID",
            "--secret-access-key",
            "secret",
        ]);
        std::env::remove_var("EC2TREE_INSTANCE_TYPE");

        assert_eq!(parsed.unwrap().tree_config().instance_type, "t4g.micro");
    }

    #[test]
    fn test_shape_flags() {
        let cli = Cli::try_parse_from([
            "ec2tree",
            "--access-key-id",
            "AKID",
            "--secret-access-key",
            "secret",
            "--max-depth",
            "3",
            "--fanout",
            "4",
            "--output",
            "json",
        ])
        .unwrap();

        let config = cli.tree_config();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.fanout, 4);
        assert_eq!(cli.output, OutputFormat::Json);
    }
}
