// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions
//!
//! How the exchange is declared on the broker. The connection manager always
//! declares a durable topic exchange with `durable_topic`.

use lapin::options::ExchangeDeclareOptions;

/// Routing strategy of an exchange.
///
/// Only `Topic` matches routing keys against `*` and `#` patterns; the
/// connection manager never declares anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> lapin::ExchangeKind {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Name, kind and lifetime flags of an exchange declaration.
///
/// Declarations are never passive, internal or no-wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition<'ex> {
    pub(crate) name: &'ex str,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
    pub(crate) auto_delete: bool,
}

impl<'ex> ExchangeDefinition<'ex> {
    pub fn new(name: &'ex str, kind: ExchangeKind) -> ExchangeDefinition<'ex> {
        ExchangeDefinition {
            name,
            kind,
            durable: false,
            auto_delete: false,
        }
    }

    /// A topic exchange that survives broker restarts and is kept when unused.
    pub fn durable_topic(name: &'ex str) -> ExchangeDefinition<'ex> {
        ExchangeDefinition::new(name, ExchangeKind::Topic).durable()
    }

    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    pub(crate) fn options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.durable,
            auto_delete: self.auto_delete,
            internal: false,
            nowait: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durable_topic_flags() {
        let def = ExchangeDefinition::durable_topic("logs");
        let opts = def.options();

        assert_eq!(def.name(), "logs");
        assert_eq!(def.kind(), ExchangeKind::Topic);
        assert!(opts.durable);
        assert!(!opts.auto_delete);
        assert!(!opts.internal);
        assert!(!opts.nowait);
        assert!(!opts.passive);
    }

    #[test]
    fn auto_delete_maps_to_declare_option() {
        let opts = ExchangeDefinition::new("tmp", ExchangeKind::Fanout)
            .auto_delete()
            .options();

        assert!(opts.auto_delete);
        assert!(!opts.durable);
    }

    #[test]
    fn converts_into_lapin_kind() {
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Topic),
            lapin::ExchangeKind::Topic
        ));
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        ));
    }
}
