use std::collections::HashMap;

/// A multiset of strings, backed by counts. Used for all four fingerprint
/// channels (`word`, `tag`, `link`, `img`).
pub type Multiset = HashMap<String, u32>;

/// Jaccard similarity between two multisets: `|a ∩ b| / |a ∪ b|`, with the
/// convention `J(∅,∅) = 1`. Intersection/union are computed over counts
/// (`Σ min(a[k],b[k])` / `Σ max(a[k],b[k])`), not over distinct keys, so
/// repeated tokens pull proportional weight.
pub fn jaccard_multiset(a: &Multiset, b: &Multiset) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut intersection: u64 = 0;
    let mut union: u64 = 0;

    for (k, &av) in a {
        let bv = b.get(k).copied().unwrap_or(0);
        intersection += av.min(bv) as u64;
        union += av.max(bv) as u64;
    }
    for (k, &bv) in b {
        if !a.contains_key(k) {
            union += bv as u64;
        }
    }

    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(items: &[&str]) -> Multiset {
        let mut m = Multiset::new();
        for i in items {
            *m.entry(i.to_string()).or_insert(0) += 1;
        }
        m
    }

    #[test]
    fn empty_vs_empty_is_one() {
        assert_eq!(jaccard_multiset(&Multiset::new(), &Multiset::new()), 1.0);
    }

    #[test]
    fn reflexive() {
        let a = ms(&["x", "y", "y", "z"]);
        assert_eq!(jaccard_multiset(&a, &a), 1.0);
    }

    #[test]
    fn symmetric_and_bounded() {
        let a = ms(&["x", "y"]);
        let b = ms(&["y", "z"]);
        let ab = jaccard_multiset(&a, &b);
        let ba = jaccard_multiset(&b, &a);
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
        // intersection {y}=1, union {x,y,z}=3
        assert!((ab - (1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn disjoint_is_zero() {
        let a = ms(&["x"]);
        let b = ms(&["y"]);
        assert_eq!(jaccard_multiset(&a, &b), 0.0);
    }
}
