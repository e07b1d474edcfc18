//! The headline averages shown on both the admin dashboard and the public
//! results page. Both call [`compute_averages`], so the two views can never
//! disagree.

use rust_decimal::Decimal;

use crate::feedback::{Feedback, form_schema::KnownSection};

/// The mean rating of each default section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionAverages {
    means: [Decimal; KnownSection::ALL.len()],
}

impl SectionAverages {
    pub fn get(&self, section: KnownSection) -> Decimal {
        self.means[section.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (KnownSection, Decimal)> + '_ {
        KnownSection::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

/// Unrated sections are left out of both the sum and the count, rather than
/// counting as zero. A section nobody rated averages to 0. Ratings are
/// included whether or not the section is still enabled on the form.
pub fn compute_averages(records: &[Feedback]) -> SectionAverages {
    let mut means = [Decimal::ZERO; KnownSection::ALL.len()];

    for section in KnownSection::ALL {
        let (sum, n) = records
            .iter()
            .filter_map(|record| record.rating(section))
            .fold((Decimal::ZERO, 0i64), |(sum, n), rating| {
                (sum + Decimal::from(rating), n + 1)
            });

        means[section.index()] = if n == 0 {
            Decimal::ZERO
        } else {
            sum / Decimal::from(n)
        };
    }

    SectionAverages { means }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::compute_averages;
    use crate::feedback::{form_schema::KnownSection, test_support::record};

    #[test]
    fn no_records_average_to_zero() {
        let averages = compute_averages(&[]);
        for (_, mean) in averages.iter() {
            assert_eq!(mean, Decimal::ZERO);
        }
    }

    #[test]
    fn unrated_sections_do_not_count_as_zero() {
        let mut records: Vec<_> =
            (1..=5).map(|i| record(&i.to_string(), i)).collect();
        records[0].venue_rating = Some(5);
        records[3].venue_rating = Some(2);

        let averages = compute_averages(&records);
        assert_eq!(averages.get(KnownSection::Overall), Decimal::from(3));
        // 7 / 2, not 7 / 5
        assert_eq!(averages.get(KnownSection::Venue), Decimal::new(35, 1));
        assert_eq!(averages.get(KnownSection::Media), Decimal::ZERO);
    }

    #[test]
    fn repeating_means_are_not_truncated_to_integers() {
        let records = [record("a", 5), record("b", 4), record("c", 4)];
        let mean = compute_averages(&records).get(KnownSection::Overall);
        assert_eq!(mean.round_dp(2), Decimal::new(433, 2));
    }
}
