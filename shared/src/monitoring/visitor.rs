//! Visitor protocol used by exporters to walk a registry.

/// How much of a registry an exporter wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Only entries marked [`Reporting::Report`].
    #[default]
    Reported,
    /// Every entry, including internal ones.
    Full,
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reported" => Ok(Self::Reported),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown monitoring mode: {other}")),
        }
    }
}

/// Whether an entry is part of the reported view of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reporting {
    /// Visible in both [`Mode::Reported`] and [`Mode::Full`].
    #[default]
    Report,
    /// Visible in [`Mode::Full`] only.
    DoNotReport,
}

impl Reporting {
    pub(crate) fn visible_in(self, mode: Mode) -> bool {
        matches!((self, mode), (Self::Report, _) | (Self::DoNotReport, Mode::Full))
    }
}

/// Receives a depth-first walk of a registry.
///
/// Every value is preceded by exactly one `on_key`. Nested registries are
/// bracketed by `on_registry_start`/`on_registry_finished`.
pub trait Visitor {
    /// A (nested) registry begins.
    fn on_registry_start(&mut self);
    /// The innermost open registry ends.
    fn on_registry_finished(&mut self);
    /// Names the next value or registry.
    fn on_key(&mut self, key: &str);
    /// An integer value for the last key.
    fn on_int(&mut self, value: i64);
}

/// Reports a single named integer.
pub fn report_int(v: &mut dyn Visitor, name: &str, value: i64) {
    v.on_key(name);
    v.on_int(value);
}

/// Reports a nested namespace whose contents are written by `f`.
pub fn report_namespace(v: &mut dyn Visitor, name: &str, f: impl FnOnce(&mut dyn Visitor)) {
    v.on_key(name);
    v.on_registry_start();
    f(v);
    v.on_registry_finished();
}
