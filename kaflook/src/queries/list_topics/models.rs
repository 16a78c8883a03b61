use crate::error::{BrowseError, BrowseResult};
use getset::Getters;
use std::fmt::{Display, Formatter};

/// Logical namespace of topic names, e.g. `dev` or `sandbox`. Has no meaning on the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: impl Into<String>) -> BrowseResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BrowseError::Configuration(
                "Environment can't be empty".to_owned(),
            ));
        }
        if name.contains('.') {
            return Err(BrowseError::Configuration(format!(
                "Environment '{name}' can't contain '.'"
            )));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> String {
        format!("{}.", self.0)
    }

    pub fn owns(&self, topic_name: &str) -> bool {
        topic_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified topic, `{environment}.{raw_name}`, and the name the broker knows it by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
#[getset(get = "pub")]
pub struct Topic {
    name: String,
    broker_name: String,
}

impl Topic {
    pub fn qualify(environment: &Environment, raw_name: &str) -> Self {
        let name = if environment.owns(raw_name) {
            raw_name.to_owned()
        } else {
            format!("{}{}", environment.prefix(), raw_name)
        };

        Self {
            name,
            broker_name: raw_name.to_owned(),
        }
    }
}

/// Maps a listed name back to a topic the broker reports.
///
/// An exact match wins. Otherwise the leading `{environment}.` the catalog added is stripped,
/// and the name is left untouched when neither is known to the broker.
pub fn broker_name_for<'a>(listed_name: &'a str, broker_names: &[String]) -> &'a str {
    if broker_names.iter().any(|name| name == listed_name) {
        return listed_name;
    }

    listed_name
        .split_once('.')
        .filter(|(environment, _)| Environment::new(*environment).is_ok())
        .map(|(_, raw_name)| raw_name)
        .filter(|raw_name| broker_names.iter().any(|name| name == raw_name))
        .unwrap_or(listed_name)
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_rejects_dots_and_blanks() {
        assert!(Environment::new("").is_err());
        assert!(Environment::new("  ").is_err());
        assert!(Environment::new("dev.eu").is_err());
        assert!(Environment::new("dev").is_ok());
    }

    #[test]
    fn owns_requires_full_segment() {
        let dev = Environment::new("dev").unwrap();

        assert!(dev.owns("dev.orders"));
        assert!(!dev.owns("devices.events"));
        assert!(!dev.owns("dev"));
    }

    #[test]
    fn qualify_keeps_already_prefixed_names() {
        let dev = Environment::new("dev").unwrap();

        assert_eq!(Topic::qualify(&dev, "dev.orders").name(), "dev.orders");
        assert_eq!(Topic::qualify(&dev, "orders").name(), "dev.orders");
        assert_eq!(Topic::qualify(&dev, "devices").name(), "dev.devices");
        assert_eq!(Topic::qualify(&dev, "orders").broker_name(), "orders");
    }

    #[test]
    fn listed_names_map_back_to_broker_names() {
        let broker = vec![
            "orders".to_owned(),
            "dev.payments".to_owned(),
            "sandbox.test_orders".to_owned(),
        ];

        assert_eq!(broker_name_for("dev.orders", &broker), "orders");
        assert_eq!(broker_name_for("dev.payments", &broker), "dev.payments");
        assert_eq!(
            broker_name_for("dev.sandbox.test_orders", &broker),
            "sandbox.test_orders"
        );
        assert_eq!(broker_name_for("dev.missing", &broker), "dev.missing");
        assert_eq!(broker_name_for("orders", &broker), "orders");
    }
}
