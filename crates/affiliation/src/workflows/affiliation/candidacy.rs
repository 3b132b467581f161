//! Election-cycle arithmetic for candidacy declarations.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::domain::{ElectiveOffice, OfficeCategory};

pub const MUNICIPAL_CYCLE_BASE: i32 = 2024;
pub const GENERAL_CYCLE_BASE: i32 = 2026;
pub const CYCLE_LENGTH_YEARS: i32 = 4;

/// Last day (month, day) on which the current cycle still accepts declarations.
pub const DECLARATION_CUTOFF: (u32, u32) = (8, 15);

impl OfficeCategory {
    pub const fn cycle_base(self) -> i32 {
        match self {
            OfficeCategory::Municipal => MUNICIPAL_CYCLE_BASE,
            OfficeCategory::General => GENERAL_CYCLE_BASE,
        }
    }
}

/// Years in which a candidacy for `office` may be declared as of `on`, ascending.
///
/// Unset offices yield an empty list.
pub fn eligible_election_years(office: Option<ElectiveOffice>, on: NaiveDate) -> Vec<i32> {
    let Some(office) = office else {
        return Vec::new();
    };

    let reference_year = on.year();
    let mut target_year = office.category().cycle_base();
    while target_year < reference_year {
        target_year += CYCLE_LENGTH_YEARS;
    }

    if reference_year < target_year {
        return vec![target_year];
    }

    if (on.month(), on.day()) <= DECLARATION_CUTOFF {
        vec![target_year]
    } else {
        vec![
            target_year + CYCLE_LENGTH_YEARS,
            target_year + 2 * CYCLE_LENGTH_YEARS,
        ]
    }
}

/// Declared year after eligibility changes: a lone option is auto-selected,
/// a year outside the eligible set is cleared, never coerced.
pub fn reconcile_declared_year(declared: Option<i32>, eligible: &[i32]) -> Option<i32> {
    match eligible {
        [only] => Some(*only),
        _ => declared.filter(|year| eligible.contains(year)),
    }
}

/// Serializable snapshot of a computed eligibility window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidacyEligibility {
    pub office: Option<ElectiveOffice>,
    pub category: Option<OfficeCategory>,
    pub reference_date: NaiveDate,
    pub years: Vec<i32>,
}

impl CandidacyEligibility {
    pub fn compute(office: Option<ElectiveOffice>, reference_date: NaiveDate) -> Self {
        Self {
            office,
            category: office.map(ElectiveOffice::category),
            reference_date,
            years: eligible_election_years(office, reference_date),
        }
    }

    pub fn admits(&self, year: i32) -> bool {
        self.years.contains(&year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn municipal_office_after_election_year_targets_next_cycle() {
        let years = eligible_election_years(Some(ElectiveOffice::CityCouncilor), date(2025, 1, 1));
        assert_eq!(years, vec![2028]);
    }

    #[test]
    fn general_office_before_election_year_targets_base_cycle() {
        let years = eligible_election_years(Some(ElectiveOffice::President), date(2025, 6, 1));
        assert_eq!(years, vec![2026]);
    }

    #[test]
    fn cutoff_day_is_inclusive() {
        let years = eligible_election_years(Some(ElectiveOffice::CityCouncilor), date(2024, 8, 15));
        assert_eq!(years, vec![2024]);
    }

    #[test]
    fn day_after_cutoff_opens_next_two_cycles() {
        let years = eligible_election_years(Some(ElectiveOffice::CityCouncilor), date(2024, 8, 16));
        assert_eq!(years, vec![2028, 2032]);

        let years = eligible_election_years(Some(ElectiveOffice::Governor), date(2026, 12, 31));
        assert_eq!(years, vec![2030, 2034]);
    }

    #[test]
    fn general_office_in_municipal_year_keeps_its_own_base() {
        let years = eligible_election_years(Some(ElectiveOffice::Senator), date(2028, 9, 1));
        assert_eq!(years, vec![2030]);

        let years = eligible_election_years(Some(ElectiveOffice::Mayor), date(2026, 9, 1));
        assert_eq!(years, vec![2028]);
    }

    #[test]
    fn unset_office_yields_no_years() {
        assert!(eligible_election_years(None, date(2024, 8, 15)).is_empty());
    }

    #[test]
    fn every_office_yields_a_non_empty_ascending_window() {
        for office in ElectiveOffice::ALL {
            for on in [date(2024, 1, 1), date(2024, 8, 16), date(2026, 8, 15), date(2031, 3, 3)] {
                let years = eligible_election_years(Some(office), on);
                assert!(!years.is_empty(), "{office} on {on}");
                assert!(years.windows(2).all(|pair| pair[0] < pair[1]));
                assert!(years.iter().all(|year| *year >= on.year()));
            }
        }
    }

    #[test]
    fn reconcile_auto_selects_single_option() {
        assert_eq!(reconcile_declared_year(None, &[2028]), Some(2028));
        assert_eq!(reconcile_declared_year(Some(2024), &[2028]), Some(2028));
    }

    #[test]
    fn reconcile_clears_years_outside_the_window() {
        assert_eq!(reconcile_declared_year(Some(2024), &[2028, 2032]), None);
        assert_eq!(reconcile_declared_year(Some(2032), &[2028, 2032]), Some(2032));
        assert_eq!(reconcile_declared_year(None, &[2028, 2032]), None);
        assert_eq!(reconcile_declared_year(Some(2028), &[]), None);
    }

    #[test]
    fn eligibility_snapshot_reports_category() {
        let snapshot =
            CandidacyEligibility::compute(Some(ElectiveOffice::ViceMayor), date(2025, 3, 1));
        assert_eq!(snapshot.category, Some(OfficeCategory::Municipal));
        assert!(snapshot.admits(2028));
        assert!(!snapshot.admits(2026));
    }
}
