use std::collections::HashMap;

use crate::models::{ConnectionRecord, PortServiceMapping, Protocol};

// ---------------------------------------------------------------------------
// ServiceCatalog: port -> label knowledge, read-only after construction
// ---------------------------------------------------------------------------

/// Where a label came from. The catalog is considered higher-confidence than
/// free-text process names, so the resolution order is a contract:
/// catalog (port+protocol), catalog (port only), observed name, fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    Catalog,
    Observed,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub label: String,
    pub source: LabelSource,
}

impl Classification {
    pub fn is_catalog_hit(&self) -> bool {
        self.source == LabelSource::Catalog
    }
}

/// Immutable port->service lookup table. Injected into the analyzer at
/// construction so tests can substitute their own catalog.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    by_port_protocol: HashMap<(u16, Protocol), String>,
    by_port: HashMap<u16, String>,
}

impl ServiceCatalog {
    pub fn from_mappings(mappings: &[PortServiceMapping]) -> Self {
        let mut by_port_protocol = HashMap::new();
        let mut by_port = HashMap::new();
        for m in mappings {
            by_port_protocol
                .entry((m.port, m.protocol))
                .or_insert_with(|| m.label.clone());
            // first mapping for a port wins the protocol-agnostic slot
            by_port.entry(m.port).or_insert_with(|| m.label.clone());
        }
        Self {
            by_port_protocol,
            by_port,
        }
    }

    /// Well-known infrastructure and database ports seen in server
    /// dependency exports.
    pub fn builtin() -> Self {
        let mappings: Vec<PortServiceMapping> = BUILTIN_SERVICES
            .iter()
            .map(|&(port, protocol, label)| PortServiceMapping {
                port,
                protocol,
                label: label.to_string(),
            })
            .collect();
        Self::from_mappings(&mappings)
    }

    /// Resolve one record to a service label.
    ///
    /// Known infrastructure ports (1521 -> Oracle, 111 -> RPC) always resolve
    /// via the catalog even when an application name is present.
    pub fn classify(&self, record: &ConnectionRecord) -> Classification {
        if let Some(label) = self
            .by_port_protocol
            .get(&(record.destination_port, record.protocol))
        {
            return Classification {
                label: label.clone(),
                source: LabelSource::Catalog,
            };
        }
        if let Some(label) = self.by_port.get(&record.destination_port) {
            return Classification {
                label: label.clone(),
                source: LabelSource::Catalog,
            };
        }
        // process-observed identity beats a guessed label when the catalog
        // has nothing for this port
        let observed = record
            .application_name
            .as_deref()
            .or(record.process_name.as_deref())
            .filter(|s| !s.trim().is_empty());
        if let Some(name) = observed {
            return Classification {
                label: name.to_string(),
                source: LabelSource::Observed,
            };
        }
        Classification {
            label: format!("Custom Port {}", record.destination_port),
            source: LabelSource::Fallback,
        }
    }

    /// All known mappings, sorted by port. Used by the CLI catalog dump.
    pub fn mappings(&self) -> Vec<PortServiceMapping> {
        let mut out: Vec<PortServiceMapping> = self
            .by_port_protocol
            .iter()
            .map(|(&(port, protocol), label)| PortServiceMapping {
                port,
                protocol,
                label: label.clone(),
            })
            .collect();
        out.sort_by_key(|m| (m.port, m.protocol as u8));
        out
    }

    pub fn len(&self) -> usize {
        self.by_port_protocol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_port_protocol.is_empty()
    }
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Web-facing traffic takes an application gateway instead of an internal
/// load balancer.
pub fn is_web_facing(port: u16, label: &str) -> bool {
    if matches!(port, 80 | 443 | 8080 | 8100 | 8443) {
        return true;
    }
    let lower = label.to_lowercase();
    lower.contains("web") || lower.contains("http")
}

const BUILTIN_SERVICES: &[(u16, Protocol, &str)] = &[
    (21, Protocol::Tcp, "FTP"),
    (22, Protocol::Tcp, "SSH"),
    (23, Protocol::Tcp, "Telnet"),
    (25, Protocol::Tcp, "SMTP Mail"),
    (53, Protocol::Udp, "DNS"),
    (53, Protocol::Tcp, "DNS"),
    (80, Protocol::Tcp, "HTTP Web"),
    (88, Protocol::Tcp, "Kerberos"),
    (111, Protocol::Tcp, "RPC Services"),
    (111, Protocol::Udp, "RPC Services"),
    (123, Protocol::Udp, "NTP"),
    (135, Protocol::Tcp, "RPC Endpoint Mapper"),
    (389, Protocol::Tcp, "LDAP"),
    (443, Protocol::Tcp, "HTTPS Web"),
    (445, Protocol::Tcp, "SMB File Sharing"),
    (636, Protocol::Tcp, "LDAPS"),
    (1433, Protocol::Tcp, "SQL Server Database"),
    (1521, Protocol::Tcp, "Oracle Database"),
    (3306, Protocol::Tcp, "MySQL Database"),
    (3389, Protocol::Tcp, "Remote Desktop"),
    (5432, Protocol::Tcp, "PostgreSQL Database"),
    (5985, Protocol::Tcp, "WinRM"),
    (5986, Protocol::Tcp, "WinRM (HTTPS)"),
    (8080, Protocol::Tcp, "HTTP Web (Alternate)"),
    (8100, Protocol::Tcp, "HTTP Web (Custom)"),
    (8443, Protocol::Tcp, "HTTPS Web (Alternate)"),
];
