use std::io;

use super::*;

/// Resolve the name this process reports as.
///
/// A non-empty `hostname_override` wins over the machine hostname. The result
/// is trimmed and lowercased, and must not end up empty.
pub fn node_name(hostname_override: &str) -> Result<String, ConfigError> {
    let name = if hostname_override.is_empty() {
        machine_hostname()?
    } else {
        hostname_override.to_string()
    };
    normalize(&name)
}

fn machine_hostname() -> Result<String, ConfigError> {
    hostname::get()
        .map_err(ConfigError::Hostname)?
        .into_string()
        .map_err(|raw| {
            let message = format!("hostname {raw:?} is not valid UTF-8");
            ConfigError::Hostname(io::Error::other(message))
        })
}

fn normalize(name: &str) -> Result<String, ConfigError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        let err = io::Error::new(io::ErrorKind::InvalidInput, "empty node name");
        Err(ConfigError::Hostname(err))
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let name = node_name("Worker-7.Example.COM").unwrap();
        assert_eq!(name, "worker-7.example.com");
    }

    #[test]
    fn override_is_trimmed() {
        let name = node_name("  worker-7\n").unwrap();
        assert_eq!(name, "worker-7");
    }

    #[test]
    fn blank_override_is_rejected() {
        let err = node_name("   ").unwrap_err();
        assert!(matches!(err, ConfigError::Hostname(_)));
    }

    #[test]
    fn empty_override_uses_machine_hostname() {
        let name = node_name("").unwrap();
        let expected = hostname::get().unwrap().into_string().unwrap();
        assert_eq!(name, expected.trim().to_lowercase());
    }
}
