//! Root collection: which keys seed the mark phase, and how.

use crate::cid::Cid;
use crate::error::{GcError, Result};
use crate::store::Pinner;
use crate::triset::Triset;

/// The class of pins a root was drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootClass {
    /// Recursively pinned: root and descendants live, failures fatal.
    Recursive,
    /// Caller-supplied root: descendants live where reachable, missing
    /// subtrees tolerated.
    BestEffort,
    /// Directly pinned: the block itself is live, nothing is traversed
    /// through it.
    Direct,
    /// Pinner bookkeeping: traversed strictly, but recursion stops at any
    /// direct pin.
    Internal,
}

impl RootClass {
    /// Seeding priority; lower seeds earlier. Strict traversal sources
    /// come first so a key reachable both strictly and best-effort is
    /// grayed strict, and terminal blackening lands before internal pins
    /// start traversing.
    pub fn priority(self) -> u8 {
        match self {
            RootClass::Recursive => 0,
            RootClass::BestEffort => 1,
            RootClass::Direct => 2,
            RootClass::Internal => 4,
        }
    }
}

/// A starting node for the mark phase.
#[derive(Clone, Debug)]
pub struct Root {
    pub cid: Cid,
    pub class: RootClass,
    /// Descendants are part of the live set.
    pub traverse: bool,
    /// A link-fetch failure anywhere under this root aborts the run.
    pub strict: bool,
    /// The root itself is live but nothing is traversed through it.
    pub terminal: bool,
}

impl Root {
    pub fn recursive(cid: Cid) -> Self {
        Self {
            cid,
            class: RootClass::Recursive,
            traverse: true,
            strict: true,
            terminal: false,
        }
    }

    pub fn best_effort(cid: Cid) -> Self {
        Self {
            cid,
            class: RootClass::BestEffort,
            traverse: true,
            strict: false,
            terminal: false,
        }
    }

    pub fn direct(cid: Cid) -> Self {
        Self {
            cid,
            class: RootClass::Direct,
            traverse: false,
            strict: true,
            terminal: true,
        }
    }

    pub fn internal(cid: Cid) -> Self {
        Self {
            cid,
            class: RootClass::Internal,
            traverse: true,
            strict: true,
            terminal: false,
        }
    }
}

/// Which locking phase the roots are collected for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedPhase {
    /// Under the first lock: recursive pins and best-effort roots only.
    Initial,
    /// Under the second lock: every pin class. Direct pins act as
    /// terminal barriers and land ahead of internal pins.
    Full,
}

/// Flush the pinner, then assemble the seed set for `phase` in seeding
/// order.
pub async fn collect_roots(
    pinner: &dyn Pinner,
    best_effort: &[Cid],
    phase: SeedPhase,
) -> Result<Vec<Root>> {
    pinner.flush().await.map_err(GcError::pinner)?;

    let mut roots = Vec::new();
    for cid in best_effort {
        roots.push(Root::best_effort(cid.clone()));
    }
    if phase == SeedPhase::Full {
        for cid in pinner.direct_keys().await.map_err(GcError::pinner)? {
            roots.push(Root::direct(cid));
        }
    }
    for cid in pinner.recursive_keys().await.map_err(GcError::pinner)? {
        roots.push(Root::recursive(cid));
    }
    if phase == SeedPhase::Full {
        for cid in pinner.internal_pins().await.map_err(GcError::pinner)? {
            roots.push(Root::internal(cid));
        }
    }

    roots.sort_by_key(|r| r.class.priority());
    Ok(roots)
}

/// Seed the triset from collected roots: terminal roots are blackened,
/// traversal roots grayed with their strictness.
pub fn seed(set: &mut Triset, roots: &[Root]) {
    for root in roots {
        if root.terminal {
            set.blacken(&root.cid);
        } else if root.traverse {
            set.insert_gray(&root.cid, root.strict);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemPinner;
    use crate::triset::Role;

    fn cid(s: &str) -> Cid {
        Cid::new(s.as_bytes())
    }

    #[tokio::test]
    async fn roots_come_back_in_seeding_order() {
        let pinner = MemPinner::new();
        pinner.pin_direct(cid("d"));
        pinner.pin_internal(cid("i"));
        pinner.pin_recursive(cid("r"));

        let roots = collect_roots(pinner.as_ref(), &[cid("b")], SeedPhase::Full)
            .await
            .unwrap();

        let classes: Vec<RootClass> = roots.iter().map(|r| r.class).collect();
        assert_eq!(
            classes,
            vec![
                RootClass::Recursive,
                RootClass::BestEffort,
                RootClass::Direct,
                RootClass::Internal,
            ]
        );

        let first = &roots[0];
        assert!(first.strict && first.traverse && !first.terminal);
        let second = &roots[1];
        assert!(!second.strict && second.traverse);
        let third = &roots[2];
        assert!(third.terminal && third.strict && !third.traverse);
        let fourth = &roots[3];
        assert!(fourth.strict && fourth.traverse && !fourth.terminal);
    }

    #[tokio::test]
    async fn initial_phase_skips_direct_and_internal_pins() {
        let pinner = MemPinner::new();
        pinner.pin_direct(cid("d"));
        pinner.pin_internal(cid("i"));
        pinner.pin_recursive(cid("r"));

        let roots = collect_roots(pinner.as_ref(), &[], SeedPhase::Initial)
            .await
            .unwrap();

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].class, RootClass::Recursive);
        assert_eq!(pinner.flush_count(), 1);
    }

    #[test]
    fn seeding_blackens_terminal_roots() {
        let mut set = Triset::new();
        let roots = vec![
            Root::recursive(cid("r")),
            Root::direct(cid("d")),
        ];

        seed(&mut set, &roots);

        assert_eq!(set.role_of(&cid("r")), Some(Role::Gray));
        assert_eq!(set.role_of(&cid("d")), Some(Role::Black));
    }
}
