//! Credential and profile prompts.

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};
use portal_scout::{Credentials, SecretString, SiteProfile};
use std::fs;
use std::path::{Path, PathBuf};

/// Use credentials from the environment, prompting for whatever is missing.
pub fn credentials(
    profile: &SiteProfile,
    username: Option<String>,
    password: Option<SecretString>,
) -> Result<Credentials> {
    let theme = ColorfulTheme::default();

    let username = match username {
        Some(username) => username,
        None => Input::<String>::with_theme(&theme)
            .with_prompt(format!("{} username", profile.name))
            .interact_text()
            .context("Failed to read username")?,
    };

    let password = match password {
        Some(password) => password,
        None => Password::with_theme(&theme)
            .with_prompt(format!("{} password", profile.name))
            .interact()
            .map(SecretString::from)
            .context("Failed to read password")?,
    };

    let credentials = Credentials::new(username, password);
    if !credentials.is_complete() {
        anyhow::bail!("Username and password must not be blank");
    }
    Ok(credentials)
}

/// Pick a profile JSON file from a directory.
pub fn choose_profile(dir: &Path) -> Result<PathBuf> {
    let mut profiles: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list profiles in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    profiles.sort();

    if profiles.is_empty() {
        anyhow::bail!("No profile files found in {}", dir.display());
    }

    let labels: Vec<String> = profiles
        .iter()
        .map(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();

    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Portal")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to read selection")?;

    Ok(profiles.swap_remove(index))
}
