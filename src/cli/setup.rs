//! `setup` command: provision the CI connected app and print how to use it

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::platform::RemoteResourceGateway;
use crate::provisioning::{
    CertificateSource, ProvisioningOrchestrator, ProvisioningResult, SetupRequest,
};

use super::output;

pub const DEFAULT_CONNECTED_APP_LABEL: &str = "Continuous Integration";

/// Shown instead of a key path when the certificate was supplied
pub const PRIVATE_KEY_PLACEHOLDER: &str = "<path to your private key>";

#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Connected app label
    #[arg(short, long, default_value = DEFAULT_CONNECTED_APP_LABEL)]
    pub name: String,

    /// Permission set label (defaults to the connected app label)
    #[arg(short, long)]
    pub permission_set_name: Option<String>,

    /// Replace an existing connected app with the same name
    #[arg(short, long)]
    pub force: bool,

    /// Use this PEM certificate instead of generating a new key pair
    #[arg(short, long, value_name = "PATH")]
    pub cert_file: Option<PathBuf>,

    /// Directory for the generated server.key and server.crt
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl SetupArgs {
    pub fn to_request(&self) -> SetupRequest {
        let certificate = match &self.cert_file {
            Some(path) => CertificateSource::Supplied(path.clone()),
            None => CertificateSource::Generate { output_dir: self.output_dir.clone() },
        };

        let request = SetupRequest::new(self.name.clone())
            .with_certificate(certificate)
            .with_force(self.force);
        match &self.permission_set_name {
            Some(label) => request.with_permission_set(label.clone()),
            None => request,
        }
    }
}

/// Handle the setup command
pub async fn handle_setup_command(
    args: SetupArgs,
    gateway: Arc<dyn RemoteResourceGateway>,
    login_url: &str,
) -> Result<()> {
    let result = ProvisioningOrchestrator::new(gateway).run(args.to_request()).await?;

    if args.json {
        output::print_json(&result)?;
    } else {
        print_summary(&result, login_url);
    }

    Ok(())
}

fn print_summary(result: &ProvisioningResult, login_url: &str) {
    let verb = if result.replaced { "replaced" } else { "created" };
    println!("{}", format!("Connected app {} {}", result.identifier, verb).green());
    println!("  Consumer key: {}", result.consumer_key.bright_yellow());
    if let Some(path) = &result.private_key_path {
        println!("  Private key: {}", path.display());
    }
    println!();
    println!("{}", follow_up_instructions(result, login_url));
}

/// How to authenticate with the new connected app and grant it to others
pub fn follow_up_instructions(result: &ProvisioningResult, login_url: &str) -> String {
    let key_file = result
        .private_key_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| PRIVATE_KEY_PLACEHOLDER.to_string());

    format!(
        "Congratulations! Your connected app is ready for use. To connect, use the following command:\n\
         \n    sfdx auth:jwt:grant -u {username} -f {key_file} -i {consumer_key} -r {login_url}\n\
         \nWe've gone ahead and assigned {username} to the {label} permission set,\n\
         but if you want to connect as another user, e.g. otheruser@example.org, you can give them access to\n\
         the connected app by assigning the permission set using:\n\
         \n    sfdx force:user:permset:assign -n {identifier} -o otheruser@example.org",
        username = result.username,
        key_file = key_file,
        consumer_key = result.consumer_key,
        login_url = login_url,
        label = result.permission_set_label,
        identifier = result.permission_set_identifier,
    )
}
