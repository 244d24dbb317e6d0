//! gittuf ref conventions and ref-advertisement parsing.

use std::collections::BTreeMap;

use bstr::ByteSlice;

/// Every ref under this prefix is a gittuf policy ref and is transported
/// transparently by the helper.
pub const GITTUF_REF_PREFIX: &str = "refs/gittuf/";

/// The authoritative reference-state-log ref.
pub const RSL_REF: &str = "refs/gittuf/reference-state-log";

/// Advertised gittuf refs and their tips, `refname -> oid`.
///
/// A non-empty map is the signal that the remote is gittuf-enabled.
pub type RefTips = BTreeMap<String, String>;

/// One parsed `<oid> SP <refname>` advertisement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRecord {
    /// The advertised target, usually a hex object id.
    pub target: String,
    /// The full ref name.
    pub name: String,
}

impl RefRecord {
    /// Parse an advertisement payload of the form
    /// `<oid> SP <refname> [NUL <capabilities>]`, truncating at the NUL.
    ///
    /// Returns `None` for payloads that do not carry at least a target and a
    /// name, or that are not valid UTF-8 in those fields.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let line = match payload.find_byte(0) {
            Some(at) => &payload[..at],
            None => payload,
        };
        let mut fields = line.trim().fields();
        let target = fields.next()?.to_str().ok()?;
        let name = fields.next()?.to_str().ok()?;
        Some(Self {
            target: target.to_owned(),
            name: name.to_owned(),
        })
    }
}

/// Whether `name` lies under the gittuf ref namespace.
pub fn is_gittuf_ref(name: &str) -> bool {
    name.starts_with(GITTUF_REF_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_advertisement() {
        let record = RefRecord::parse(b"deadbeef refs/heads/main\n").unwrap();
        assert_eq!(record.target, "deadbeef");
        assert_eq!(record.name, "refs/heads/main");
    }

    #[test]
    fn truncates_capabilities_at_nul() {
        let record =
            RefRecord::parse(b"deadbeef refs/heads/main\0side-band-64k agent=git/2.43\n").unwrap();
        assert_eq!(record.name, "refs/heads/main");
    }

    #[test]
    fn rejects_short_records() {
        assert_eq!(RefRecord::parse(b"deadbeef\n"), None);
        assert_eq!(RefRecord::parse(b"\n"), None);
        assert_eq!(RefRecord::parse(b""), None);
    }

    #[test]
    fn recognizes_gittuf_refs() {
        assert!(is_gittuf_ref(RSL_REF));
        assert!(is_gittuf_ref("refs/gittuf/policy"));
        assert!(!is_gittuf_ref("refs/heads/main"));
        assert!(!is_gittuf_ref("refs/gittufx"));
    }
}
