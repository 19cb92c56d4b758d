/// Parsed form of an internal-node label.
///
/// Labels follow the `support:taxon|auxiliary` convention used by
/// taxonomically decorated trees: an optional bootstrap/support value, an
/// optional taxon name (possibly compound, semicolon-separated), and
/// optional auxiliary info after a pipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeLabel {
    pub support: Option<f64>,
    pub taxon: Option<String>,
    pub auxiliary: Option<String>,
}

/// Parse a raw node label. Fails closed: malformed input yields a label
/// with no taxon rather than an error.
pub fn parse_label(label: &str) -> NodeLabel {
    let mut parsed = NodeLabel::default();

    let mut rest = label.trim();
    if rest.is_empty() {
        return parsed;
    }

    if let Some((head, aux)) = rest.split_once('|') {
        parsed.auxiliary = Some(aux.trim().to_string());
        rest = head.trim();
    }

    if let Some((support, taxon)) = rest.split_once(':') {
        match support.trim().parse::<f64>() {
            Ok(v) => {
                parsed.support = Some(v);
                let taxon = taxon.trim();
                if !taxon.is_empty() {
                    parsed.taxon = Some(taxon.to_string());
                }
            }
            // malformed support value: no taxon is reported
            Err(_) => return parsed,
        }
    } else if let Ok(v) = rest.parse::<f64>() {
        parsed.support = Some(v);
    } else if !rest.is_empty() {
        parsed.taxon = Some(rest.to_string());
    }

    parsed
}

/// Whether a taxon name is compound (names multiple ranks at one node,
/// e.g. `p__Armatimonadetes; c__Chthonomonadetes`).
pub fn is_compound(taxon: &str) -> bool {
    taxon.contains(';')
}

/// Most specific component of a possibly compound taxon name.
pub fn most_specific_taxon(taxon: &str) -> &str {
    taxon.rsplit(';').next().unwrap_or(taxon).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_taxon() {
        let l = parse_label("p__Firmicutes");
        assert_eq!(l.taxon.as_deref(), Some("p__Firmicutes"));
        assert_eq!(l.support, None);
        assert_eq!(l.auxiliary, None);
    }

    #[test]
    fn test_bare_support() {
        let l = parse_label("87");
        assert_eq!(l.support, Some(87.0));
        assert_eq!(l.taxon, None);
    }

    #[test]
    fn test_support_and_taxon() {
        let l = parse_label("100:p__Firmicutes");
        assert_eq!(l.support, Some(100.0));
        assert_eq!(l.taxon.as_deref(), Some("p__Firmicutes"));
    }

    #[test]
    fn test_auxiliary_suffix() {
        let l = parse_label("95:g__Bacillus|extra=1");
        assert_eq!(l.support, Some(95.0));
        assert_eq!(l.taxon.as_deref(), Some("g__Bacillus"));
        assert_eq!(l.auxiliary.as_deref(), Some("extra=1"));
    }

    #[test]
    fn test_malformed_support_fails_closed() {
        let l = parse_label("abc:p__Firmicutes");
        assert_eq!(l.support, None);
        assert_eq!(l.taxon, None);
    }

    #[test]
    fn test_empty_label() {
        assert_eq!(parse_label("   "), NodeLabel::default());
    }

    #[test]
    fn test_compound_helpers() {
        let taxon = "p__Armatimonadetes; c__Chthonomonadetes";
        assert!(is_compound(taxon));
        assert_eq!(most_specific_taxon(taxon), "c__Chthonomonadetes");
        assert!(!is_compound("p__Firmicutes"));
        assert_eq!(most_specific_taxon("p__Firmicutes"), "p__Firmicutes");
    }
}
