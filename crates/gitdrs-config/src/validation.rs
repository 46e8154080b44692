// git-drs - Large files for Git, backed by data repositories
// Copyright (C) 2025 git-drs Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(name) = &self.default_remote {
            if !self.remotes.contains_key(name) {
                return Err(ConfigError::UnknownRemote {
                    name: name.clone(),
                    available: self.list_remotes(),
                });
            }
        }

        for (name, remote) in &self.remotes {
            if name.trim().is_empty() {
                return Err(ConfigError::validation_error("remote names must not be empty"));
            }
            remote.validate().map_err(|e| {
                ConfigError::validation_error(format!("remote '{}': {}", name, e))
            })?;
        }

        self.transfer.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Validator for RemoteConfig {
    fn validate(&self) -> ConfigResult<()> {
        project_to_resource(self.project_id())?;

        match self {
            RemoteConfig::Indexd(r) => {
                validate_url("endpoint", &r.endpoint)?;
                if r.bucket.is_empty() {
                    return Err(ConfigError::MissingRequired("bucket".to_string()));
                }
            }
            RemoteConfig::S3(r) => {
                if r.bucket.is_empty() {
                    return Err(ConfigError::MissingRequired("bucket".to_string()));
                }
                if let Some(endpoint) = &r.endpoint {
                    validate_url("endpoint", endpoint)?;
                }
            }
            RemoteConfig::Local(r) => {
                validate_url("base_url", &r.base_url)?;
            }
        }

        Ok(())
    }
}

impl Validator for TransferConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "transfer.concurrency",
                "must be at least 1",
            ));
        }

        if let Some(cmd) = &self.fetch_command {
            if cmd.program.trim().is_empty() {
                return Err(ConfigError::MissingRequired(
                    "transfer.fetch_command.program".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Validator for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(format) = &self.format {
            let valid_formats = ["pretty", "compact", "json"];
            if !valid_formats.contains(&format.to_lowercase().as_str()) {
                return Err(ConfigError::invalid_value(
                    "logging.format",
                    format!("must be one of: {}", valid_formats.join(", ")),
                ));
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::MissingRequired(field.to_string()));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            field,
            format!("'{}' must start with http:// or https://", value),
        ));
    }
    Ok(())
}
