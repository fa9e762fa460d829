use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::AppConfig;
use crate::google::CredentialStore;
use crate::google::oauth::{ClientSecrets, authorization_url, exchange_code_for_token};

/// One-time authorization. Walks the user through Google's consent
/// screen and writes the resulting token file.
pub async fn run(config: &AppConfig) -> Result<()> {
    let secrets = ClientSecrets::from_file(Path::new(&config.credentials_path))
        .with_context(|| format!("Unable to load client secrets from {}", config.credentials_path))?;

    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        authorization_url(&secrets)
    );
    println!(
        "After approving, Google redirects to {}. Copy the `code` parameter from that address.",
        secrets.redirect_uri()
    );
    print!("Paste the authorization code here: ");
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim();
    if code.is_empty() {
        anyhow::bail!("No authorization code entered");
    }

    let token = exchange_code_for_token(&secrets, code).await?;
    CredentialStore::new(&config.token_path, &config.credentials_path).save(&token)?;
    tracing::info!("Saved calendar token to {}", config.token_path);
    println!("Authorization complete. Token saved to {}.", config.token_path);

    Ok(())
}
