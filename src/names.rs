//! Qualified-name resolution
//!
//! Lexical names found in schemas and documents come in three shapes:
//! Clark notation (`{uri}local`), prefixed (`prefix:local`) and bare
//! (`local`). This module turns all of them into [`QName`]s.

use crate::error::{Error, Result};
use crate::namespaces::{upgrade_xsd_namespace, NamespaceTable, QName};
use once_cell::sync::Lazy;
use regex::Regex;

static CLARK_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{(.+)\}(.*)$").unwrap());

static NCNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_\-\.\u{B7}]*$").unwrap());

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (`prefix:local` or `local`)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Split a lexical name into optional prefix and local part
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// Qualify a lexical name
///
/// Clark names are returned unchanged (apart from XML Schema namespace
/// upgrades). Prefixed names are resolved through `namespaces`; unprefixed
/// names use `default_namespace`, falling back to the table's own default.
pub fn qualify(
    namespaces: &NamespaceTable,
    default_namespace: Option<&str>,
    name: &str,
) -> Result<QName> {
    if let Some(caps) = CLARK_NAME.captures(name) {
        let namespace = upgrade_xsd_namespace(&caps[1]);
        return Ok(QName::new(namespace, &caps[2]));
    }

    match split_qname(name) {
        (Some(prefix), local) => match namespaces.get_namespace(prefix) {
            Some(namespace) => Ok(QName::new(namespace, local)),
            None => Err(Error::UnknownNamespacePrefix {
                prefix: prefix.to_string(),
                name: name.to_string(),
            }),
        },
        (None, local) => match default_namespace.or_else(|| namespaces.default_namespace()) {
            Some(namespace) => Ok(QName::new(namespace, local)),
            None => Err(Error::UnqualifiedNameNoDefault(name.to_string())),
        },
    }
}

/// Qualify the name of a declaration against a schema's target namespace
///
/// Declarations (`name="..."`) are always in the target namespace, so a
/// prefixed or Clark name is only accepted as-is and never re-resolved.
pub fn qualify_target(target_namespace: &str, name: &str) -> QName {
    if let Some(qname) = QName::from_clark(name) {
        return qname;
    }
    QName::new(target_namespace, split_qname(name).1)
}

/// Remove any `{uri}` or `prefix:` decoration from a name
pub fn strip(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('{') {
        if let Some((_, local)) = rest.split_once('}') {
            return local;
        }
    }
    split_qname(name).1
}
