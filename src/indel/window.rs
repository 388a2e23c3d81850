use super::{Indel, PointMutation};
use crate::utils::PamOrientation;

/// Seed/PAM guard window, exclusive bounds relative to the cut site.
const GUARD_LEFT: (i32, i32) = (-15, 6);
const GUARD_RIGHT: (i32, i32) = (-14, 7);
const GUARD_MUTATION: (i32, i32) = (-14, 7);

/// Background template acceptance bounds.
const BACKGROUND_MUTATION_WINDOW: (i32, i32) = (-20, 6);
const MAX_BACKGROUND_MUTATIONS: usize = 5;
const MAX_BACKGROUND_INDEL_LEN: u32 = 2;

fn within(value: i32, bounds: (i32, i32)) -> bool {
    value > bounds.0 && value < bounds.1
}

impl Indel {
    /// Whether the event fits within the sequenced window around the cut site.
    pub fn is_detectable(
        &self,
        reference_len: usize,
        pam_loc: usize,
        orientation: PamOrientation,
    ) -> bool {
        if self.is_null() {
            return true;
        }
        let before_pam = pam_loc as i64 - 3;
        let after_pam = reference_len as i64 - pam_loc as i64 - 3;
        let (space_left, space_right) = match orientation {
            PamOrientation::Forward => (before_pam, after_pam),
            PamOrientation::Reverse => (after_pam, before_pam),
        };
        (self.left().abs() as i64) < space_left && (self.right() as i64) < space_right
    }

    /// True when neither the edit nor any marked point mutation touches the
    /// guide seed or PAM.
    pub fn is_out_of_guide_seed_pam(&self) -> bool {
        if self.is_null() && self.mutations().is_empty() {
            return true;
        }
        if !self.is_null() && (within(self.left(), GUARD_LEFT) || within(self.right(), GUARD_RIGHT))
        {
            return false;
        }
        !self.mutations().iter().any(|mutation| match mutation {
            PointMutation::Mismatch { pos: 0 } => false,
            other => other
                .marked_position()
                .is_some_and(|pos| within(pos, GUARD_MUTATION)),
        })
    }

    /// Whether a background (plasmid) template is clean enough for its reads
    /// to be used: no marked mutations near the guide, few mutations overall,
    /// and only short edits away from the target region.
    pub fn is_allowable_background(&self) -> bool {
        let marked: Vec<i32> = self
            .mutations()
            .iter()
            .filter_map(|m| m.marked_position())
            .collect();
        if marked.iter().any(|&pos| within(pos, BACKGROUND_MUTATION_WINDOW))
            || marked.len() > MAX_BACKGROUND_MUTATIONS
        {
            return false;
        }
        let long_indel_mutation = self.mutations().iter().any(|m| match m {
            PointMutation::Deletion { len, .. } | PointMutation::Insertion { len, .. } => {
                *len > MAX_BACKGROUND_INDEL_LEN
            }
            _ => false,
        });
        if long_indel_mutation {
            return false;
        }
        if !self.is_null()
            && (self.size() > MAX_BACKGROUND_INDEL_LEN
                || (self.left() < BACKGROUND_MUTATION_WINDOW.1
                    && self.right() > BACKGROUND_MUTATION_WINDOW.0))
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indel(text: &str) -> Indel {
        Indel::parse(text).unwrap()
    }

    #[test]
    fn null_is_out_of_guide() {
        assert!(indel("-").is_out_of_guide_seed_pam());
        assert!(indel("-_-").is_out_of_guide_seed_pam());
    }

    #[test]
    fn left_at_minus_one_is_in_guide() {
        for text in ["D2_L-1R2", "I1_L-1R0", "D30_L-1R30", "D5_L-1C2R5_M40"] {
            assert!(!indel(text).is_out_of_guide_seed_pam(), "{}", text);
        }
    }

    #[test]
    fn far_edits_are_out_of_guide() {
        assert!(indel("D2_L-30R-27").is_out_of_guide_seed_pam());
        assert!(indel("D2_L20R23").is_out_of_guide_seed_pam());
    }

    #[test]
    fn mutations_inside_window_are_in_guide() {
        assert!(!indel("-_M-3").is_out_of_guide_seed_pam());
        assert!(!indel("-_D1S2").is_out_of_guide_seed_pam());
        assert!(indel("-_M0").is_out_of_guide_seed_pam());
        assert!(indel("-_M-14").is_out_of_guide_seed_pam());
        assert!(indel("-_N-3[A]").is_out_of_guide_seed_pam());
        assert!(indel("D2_L-30R-27_M25").is_out_of_guide_seed_pam());
    }

    #[test]
    fn detectable_forward_and_reverse() {
        // 79nt oligo with PAM at 42: 39 bases left of the PAM, 34 right of it
        let d = indel("D10_L-35R1");
        assert!(d.is_detectable(79, 42, PamOrientation::Forward));
        assert!(!d.is_detectable(79, 42, PamOrientation::Reverse));
        let far_right = indel("D3_L-1R36");
        assert!(!far_right.is_detectable(79, 42, PamOrientation::Forward));
        assert!(Indel::null().is_detectable(10, 1, PamOrientation::Forward));
    }

    #[test]
    fn allowable_background_templates() {
        assert!(indel("-").is_allowable_background());
        assert!(indel("-_M30").is_allowable_background());
        assert!(!indel("-_M-5").is_allowable_background());
        assert!(!indel("-_M10M12M14M16M18M20").is_allowable_background());
        assert!(!indel("-_D3S30").is_allowable_background());
        assert!(indel("D1_L-25R-23").is_allowable_background());
        assert!(!indel("D3_L-30R-26").is_allowable_background());
        assert!(!indel("D1_L-2R0").is_allowable_background());
    }
}
