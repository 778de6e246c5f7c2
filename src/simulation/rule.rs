//! Transition rules
//!
//! A rule is a pure function from a [`Neighborhood`] to the cell's next value.
//! The CPU backend evaluates [`TransitionRule`] directly; the GPU kernel
//! evaluates the Life-like family through the birth/survival masks of
//! [`LifeRule`].

use std::fmt;
use std::str::FromStr;

use super::boundary::Neighborhood;
use super::cell::Cell;
use crate::error::AutomatonError;

/// Per-cell transition, evaluated independently for every coordinate
///
/// Implementations must be pure: no interior mutability, no dependence on
/// evaluation order. The backend may call `transition` from many threads.
pub trait TransitionRule: Send + Sync {
    fn transition(&self, neighborhood: &Neighborhood) -> Cell;

    /// Short name for logs
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> TransitionRule for F
where
    F: Fn(&Neighborhood) -> Cell + Send + Sync,
{
    fn transition(&self, neighborhood: &Neighborhood) -> Cell {
        self(neighborhood)
    }

    fn name(&self) -> String {
        "closure".to_string()
    }
}

/// Life-like birth/survival rule, bit `n` set means "n live neighbors"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeRule {
    pub birth: u16,
    pub survive: u16,
}

impl LifeRule {
    /// Conway's Game of Life, B3/S23
    pub const CONWAY: LifeRule = LifeRule {
        birth: 1 << 3,
        survive: (1 << 2) | (1 << 3),
    };

    /// Highest meaningful neighbor count in a Moore neighborhood
    const MAX_NEIGHBORS: u32 = 8;

    pub fn new(birth: &[u32], survive: &[u32]) -> Result<Self, AutomatonError> {
        Ok(Self {
            birth: Self::mask(birth)?,
            survive: Self::mask(survive)?,
        })
    }

    fn mask(counts: &[u32]) -> Result<u16, AutomatonError> {
        counts.iter().try_fold(0u16, |mask, &count| {
            if count > Self::MAX_NEIGHBORS {
                Err(AutomatonError::config(format!(
                    "neighbor count {count} exceeds {}",
                    Self::MAX_NEIGHBORS
                )))
            } else {
                Ok(mask | (1 << count))
            }
        })
    }

    pub fn births_on(&self, live_neighbors: u32) -> bool {
        live_neighbors <= Self::MAX_NEIGHBORS && self.birth & (1 << live_neighbors) != 0
    }

    pub fn survives_on(&self, live_neighbors: u32) -> bool {
        live_neighbors <= Self::MAX_NEIGHBORS && self.survive & (1 << live_neighbors) != 0
    }
}

impl Default for LifeRule {
    fn default() -> Self {
        Self::CONWAY
    }
}

impl TransitionRule for LifeRule {
    fn transition(&self, neighborhood: &Neighborhood) -> Cell {
        let live = neighborhood.live_neighbors();
        let alive = if neighborhood.center.is_alive() {
            self.survives_on(live)
        } else {
            self.births_on(live)
        };
        Cell::from_alive(alive)
    }

    fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LifeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = |mask: u16| -> String {
            (0..=Self::MAX_NEIGHBORS)
                .filter(|n| mask & (1 << n) != 0)
                .map(|n| char::from(b'0' + n as u8))
                .collect()
        };
        write!(f, "B{}/S{}", digits(self.birth), digits(self.survive))
    }
}

impl FromStr for LifeRule {
    type Err = AutomatonError;

    /// Parse a rulestring such as `B3/S23` (case-insensitive, either order)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut birth = None;
        let mut survive = None;

        for part in s.trim().split('/') {
            let mut chars = part.chars();
            let target = match chars.next().map(|c| c.to_ascii_uppercase()) {
                Some('B') => &mut birth,
                Some('S') => &mut survive,
                _ => return Err(AutomatonError::config(format!("malformed rulestring '{s}'"))),
            };
            let counts = chars
                .map(|c| {
                    c.to_digit(10)
                        .ok_or_else(|| AutomatonError::config(format!("malformed rulestring '{s}'")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if target.replace(Self::mask(&counts)?).is_some() {
                return Err(AutomatonError::config(format!("duplicate section in rulestring '{s}'")));
            }
        }

        match (birth, survive) {
            (Some(birth), Some(survive)) => Ok(Self { birth, survive }),
            _ => Err(AutomatonError::config(format!(
                "rulestring '{s}' needs both B and S sections"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::boundary::BoundaryPolicy;
    use crate::simulation::cell::Grid;

    #[test]
    fn test_parse_conway() {
        let rule: LifeRule = "B3/S23".parse().unwrap();
        assert_eq!(rule, LifeRule::CONWAY);
        assert_eq!(rule.to_string(), "B3/S23");

        let reordered: LifeRule = "s23/b3".parse().unwrap();
        assert_eq!(reordered, LifeRule::CONWAY);
    }

    #[test]
    fn test_parse_empty_sections() {
        let rule: LifeRule = "B12345678/S".parse().unwrap();
        assert_eq!(rule.survive, 0);
        assert!(rule.births_on(1));
        assert!(!rule.births_on(0));
        assert_eq!(rule.to_string(), "B12345678/S");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("B9/S23".parse::<LifeRule>().is_err());
        assert!("B3".parse::<LifeRule>().is_err());
        assert!("B3/S2x".parse::<LifeRule>().is_err());
        assert!("B3/B2".parse::<LifeRule>().is_err());
        assert!("Q3/S23".parse::<LifeRule>().is_err());
    }

    #[test]
    fn test_conway_transitions() {
        // Blinker: the center of a horizontal bar survives, cells above it are born
        let grid = Grid::from_alive_map(
            3,
            3,
            &[false, false, false, true, true, true, false, false, false],
        )
        .unwrap();

        let center = Neighborhood::gather(&grid, 1, 1, BoundaryPolicy::Dead);
        assert!(LifeRule::CONWAY.transition(&center).is_alive());

        let top = Neighborhood::gather(&grid, 1, 0, BoundaryPolicy::Dead);
        assert!(LifeRule::CONWAY.transition(&top).is_alive());

        let left = Neighborhood::gather(&grid, 0, 1, BoundaryPolicy::Dead);
        assert!(!LifeRule::CONWAY.transition(&left).is_alive());
    }

    #[test]
    fn test_closure_rule() {
        let invert = |n: &Neighborhood| Cell::from_alive(!n.center.is_alive());
        let grid = Grid::new(1, 1);
        let hood = Neighborhood::gather(&grid, 0, 0, BoundaryPolicy::Wrap);
        assert!(invert.transition(&hood).is_alive());
    }
}
