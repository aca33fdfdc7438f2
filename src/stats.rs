use std::collections::HashMap;

/// Extracted cycles grouped by policy name.
///
/// Policies keep the order in which they were first seen; cycles keep the order
/// in which they were pushed.
#[derive(Debug)]
pub struct Accumulator<U> {
    policies: Vec<(String, Vec<U>)>,
    index: HashMap<String, usize>,
}

impl<U> Default for Accumulator<U> {
    fn default() -> Self {
        Self {
            policies: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<U> Accumulator<U> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cycle list for `policy`, created empty on first use.
    pub fn policy(&mut self, policy: &str) -> &mut Vec<U> {
        let slot = match self.index.get(policy) {
            Some(&slot) => slot,
            None => {
                self.policies.push((policy.to_string(), Vec::new()));
                self.index.insert(policy.to_string(), self.policies.len() - 1);
                self.policies.len() - 1
            }
        };
        &mut self.policies[slot].1
    }

    pub fn push(&mut self, policy: &str, unit: U) {
        self.policy(policy).push(unit);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[U])> {
        self.policies
            .iter()
            .map(|(policy, units)| (policy.as_str(), units.as_slice()))
    }

    /// Number of distinct policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn cycle_count(&self) -> usize {
        self.policies.iter().map(|(_, units)| units.len()).sum()
    }

    pub fn into_inner(self) -> Vec<(String, Vec<U>)> {
        self.policies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_by_policy_in_first_seen_order() {
        let mut acc = Accumulator::new();
        acc.push("vanilla", 1);
        acc.push("block3p", 2);
        acc.push("vanilla", 3);
        acc.policy("split-key");

        let grouped: Vec<(&str, &[i32])> = acc.iter().collect();
        assert_eq!(
            grouped,
            vec![
                ("vanilla", &[1, 3][..]),
                ("block3p", &[2][..]),
                ("split-key", &[][..]),
            ]
        );
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.cycle_count(), 3);
    }

    #[test]
    fn test_into_inner_transfers_everything() {
        let mut acc = Accumulator::new();
        acc.push("vanilla", "c1".to_string());
        let inner = acc.into_inner();
        assert_eq!(inner, vec![("vanilla".to_string(), vec!["c1".to_string()])]);
    }
}
