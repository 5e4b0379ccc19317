//! Search parameters and the optional parameter-file loader.

use log::warn;
use std::path::Path;

/// Tunable constants of the PUCT search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Per-descent visit cap slope for non-root nodes: a descent into a
    /// node may add at most `expand_factor * visits + 1` new visits.
    pub expand_factor: f64,
    /// Base exploration coefficient.
    pub puct: f64,
    /// Exponent of the visit-dependent exploration growth.
    pub puct_pow: f64,
    /// Visit offset normalizing the exploration growth.
    pub puct_base: f64,
    /// First-play-urgency reduction applied to unvisited children.
    pub fpu_reduction: f64,
    /// Softmax temperature applied to raw policy logits.
    pub policy_temp: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            expand_factor: 1.0,
            puct: 1.5,
            puct_pow: 0.75,
            puct_base: 10.0,
            fpu_reduction: 0.2,
            policy_temp: 1.0,
        }
    }
}

/// Expected names, in file order.
const PARAM_NAMES: [&str; 6] = [
    "expandFactor",
    "puct",
    "puctPow",
    "puctBase",
    "fpuReduction",
    "policyTemp",
];

impl SearchParams {
    /// Loads six `name value` pairs in fixed order from a plain text file.
    ///
    /// A missing or unreadable file is ignored. Any name or value mismatch
    /// is logged and leaves `self` completely unchanged.
    pub fn load_from_file(&mut self, path: &Path) {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return,
        };
        let mut tokens = text.split_whitespace();
        let mut values = [0f64; 6];
        for (i, name) in PARAM_NAMES.iter().enumerate() {
            match tokens.next() {
                Some(tok) if tok == *name => {}
                Some(tok) => {
                    warn!("param file: expected name {:?}, found {:?}", name, tok);
                    return;
                }
                None => {
                    warn!("param file: truncated before {:?}", name);
                    return;
                }
            }
            match tokens.next().map(str::parse::<f64>) {
                Some(Ok(v)) => values[i] = v,
                _ => {
                    warn!("param file: bad value for {:?}", name);
                    return;
                }
            }
        }
        self.expand_factor = values[0];
        self.puct = values[1];
        self.puct_pow = values[2];
        self.puct_base = values[3];
        self.fpu_reduction = values[4];
        self.policy_temp = values[5];
    }
}
