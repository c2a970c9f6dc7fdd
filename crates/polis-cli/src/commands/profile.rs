//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::PathBuf;

/// Execute the profile command.
pub async fn execute_profile(args: ProfileArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Use { name } => {
            use_profile(config, name, formatter)?;
            config.save()
        }
        ProfileAction::Set {
            name,
            url,
            database,
            owner,
            email,
        } => {
            set_profile(config, name, url, database, owner, email, formatter);
            config.save()
        }
        ProfileAction::Delete { name } => {
            if delete_profile(config, name, formatter)? {
                config.save()?;
            }
            Ok(())
        }
    }
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    println!("Available profiles:");
    for (name, profile) in &config.profiles {
        if name == &config.active_profile {
            println!("* {}", formatter.success(name));
        } else {
            println!("  {}", name);
        }
        print_profile(profile, "    ");
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;

    println!("Active profile: {}", formatter.success(&config.active_profile));
    print_profile(profile, "  ");

    Ok(())
}

fn print_profile(profile: &Profile, indent: &str) {
    println!("{}Extraction URL: {}", indent, profile.extraction_url);
    println!("{}Database: {}", indent, profile.database_path.display());
    if let Some(owner) = &profile.default_owner {
        println!("{}Default owner: {}", indent, owner);
    }
    if let Some(email) = &profile.default_email {
        println!("{}Default email: {}", indent, email);
    }
}

/// Switch to a different profile.
fn use_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    println!("{}", formatter.success(&format!("Switched to profile '{}'", name)));
    Ok(())
}

/// Create or update a profile.
fn set_profile(
    config: &mut Config,
    name: String,
    url: String,
    database: PathBuf,
    owner: Option<String>,
    email: Option<String>,
    formatter: &Formatter,
) {
    let profile = Profile {
        extraction_url: url,
        database_path: database,
        default_owner: owner,
        default_email: email,
    };

    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };

    config.set_profile(name.clone(), profile);
    println!("{}", formatter.success(&format!("{} profile '{}'", action, name)));
}

/// Delete a profile, returning whether anything was removed.
fn delete_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<bool> {
    if name == config.active_profile {
        return Err(CliError::NotPermitted("Cannot delete the active profile".to_string()));
    }

    if config.profiles.remove(&name).is_some() {
        println!("{}", formatter.success(&format!("Deleted profile '{}'", name)));
        Ok(true)
    } else {
        println!("{}", formatter.warning(&format!("Profile '{}' does not exist", name)));
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_set_and_use_profile() {
        let mut config = Config::default();
        let formatter = Formatter::new(OutputFormat::Table, false);

        set_profile(
            &mut config,
            "work".to_string(),
            "http://extract.internal/api".to_string(),
            PathBuf::from("work.db"),
            Some("user-1".to_string()),
            None,
            &formatter,
        );
        assert!(config.profiles.contains_key("work"));

        use_profile(&mut config, "work".to_string(), &formatter).unwrap();
        assert_eq!(config.active_profile, "work");
        assert_eq!(config.get_active_profile().unwrap().database_path, PathBuf::from("work.db"));
    }

    #[test]
    fn test_use_unknown_profile() {
        let mut config = Config::default();
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert!(use_profile(&mut config, "missing".to_string(), &formatter).is_err());
        assert_eq!(config.active_profile, "default");
    }

    #[test]
    fn test_delete_active_profile() {
        let mut config = Config::default();
        let formatter = Formatter::new(OutputFormat::Table, false);

        let result = delete_profile(&mut config, "default".to_string(), &formatter);
        assert!(matches!(result, Err(CliError::NotPermitted(_))));
    }

    #[test]
    fn test_delete_unknown_profile_changes_nothing() {
        let mut config = Config::default();
        let formatter = Formatter::new(OutputFormat::Table, false);

        assert!(!delete_profile(&mut config, "ghost".to_string(), &formatter).unwrap());
        assert_eq!(config.profiles.len(), 1);
    }
}
