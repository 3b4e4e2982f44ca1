//! ALPM-style version ordering (`[epoch:]version[-release]`)
//!
//! Used to put changelog entries in newest-first order. Fixture versions are
//! otherwise opaque strings and never parsed.

use std::cmp::Ordering;

/// Compare two version strings the way `alpm_pkg_vercmp` does.
#[must_use]
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    if v1 == v2 {
        return Ordering::Equal;
    }

    let (e1, vr1) = split_epoch(v1);
    let (e2, vr2) = split_epoch(v2);
    match e1.cmp(&e2) {
        Ordering::Equal => {}
        other => return other,
    }

    let (ver1, rel1) = split_release(vr1);
    let (ver2, rel2) = split_release(vr2);
    match compare_segments(ver1, ver2) {
        Ordering::Equal => {}
        other => return other,
    }

    // A missing release on either side compares equal
    match (rel1, rel2) {
        (Some(r1), Some(r2)) => compare_segments(r1, r2),
        _ => Ordering::Equal,
    }
}

fn split_epoch(version: &str) -> (u64, &str) {
    match version.split_once(':') {
        Some((epoch, rest)) if epoch.bytes().all(|b| b.is_ascii_digit()) => {
            (epoch.parse().unwrap_or(0), rest)
        }
        _ => (0, version),
    }
}

fn split_release(version: &str) -> (&str, Option<&str>) {
    match version.rsplit_once('-') {
        Some((ver, rel)) => (ver, Some(rel)),
        None => (version, None),
    }
}

fn take_while(s: &str, pred: impl Fn(u8) -> bool) -> (&str, &str) {
    let end = s.bytes().position(|b| !pred(b)).unwrap_or(s.len());
    s.split_at(end)
}

fn compare_segments(mut one: &str, mut two: &str) -> Ordering {
    loop {
        let (sep1, rest1) = take_while(one, |b| !b.is_ascii_alphanumeric());
        let (sep2, rest2) = take_while(two, |b| !b.is_ascii_alphanumeric());
        one = rest1;
        two = rest2;

        if one.is_empty() || two.is_empty() {
            break;
        }
        // More separators means a newer version ("1..0" vs "1.0")
        if sep1.len() != sep2.len() {
            return sep1.len().cmp(&sep2.len());
        }

        let numeric = one.as_bytes().first().is_some_and(u8::is_ascii_digit);
        let is_seg: fn(u8) -> bool = if numeric {
            |b| b.is_ascii_digit()
        } else {
            |b| b.is_ascii_alphabetic()
        };
        let (seg1, rest1) = take_while(one, is_seg);
        let (seg2, rest2) = take_while(two, is_seg);

        if seg2.is_empty() {
            // Numeric segments always beat alphabetic ones
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let a = seg1.trim_start_matches('0');
            let b = seg2.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        } else {
            seg1.cmp(seg2)
        };
        if ord != Ordering::Equal {
            return ord;
        }

        one = rest1;
        two = rest2;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        // Leftover alpha is a pre-release and loses to nothing
        (true, false) if two.as_bytes().first().is_some_and(u8::is_ascii_alphabetic) => {
            Ordering::Greater
        }
        (true, false) => Ordering::Less,
        (false, _) if one.as_bytes().first().is_some_and(u8::is_ascii_alphabetic) => {
            Ordering::Less
        }
        (false, _) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_ordering() {
        assert_eq!(compare_versions("1.0.0", "0.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("0.9.0", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
    }

    #[test]
    fn test_epoch_wins() {
        assert_eq!(compare_versions("1:0.1", "9.9"), Ordering::Greater);
    }

    #[test]
    fn test_release() {
        assert_eq!(compare_versions("5.2.2-3", "5.2.2-2"), Ordering::Greater);
        assert_eq!(compare_versions("5.2.2", "5.2.2-2"), Ordering::Equal);
    }

    #[test]
    fn test_prerelease_and_trailing_segments() {
        assert_eq!(compare_versions("1.0a", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0alpha", "1.0beta"), Ordering::Less);
        assert_eq!(compare_versions("1.0.a", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(compare_versions("1.001", "1.1"), Ordering::Equal);
    }
}
