//! Vacation countdown phrases.
//!
//! Maps the time remaining until a target date onto a tier (milestone
//! day, week-plus range, final hours) and renders a random phrase from
//! the catalog for that tier.

pub mod catalog;

pub use catalog::{Catalog, PluralWords};

use chrono::{DateTime, TimeZone};
use clock::{days_floor, hours_ceil, MS_PER_DAY};
use rand::Rng;

/// Countdown tier resolved from the target/base pair.
///
/// Milestones win over range tiers, so day 30 renders its own phrases
/// rather than the generic month bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Past { days_ago: i64 },
    Milestone { days: i64 },
    HoursToday { hours: i64 },
    Today,
    FarFuture,
    Quarter { days: i64 },
    TwoMonths { days: i64 },
    Month { days: i64 },
    TwoWeeks { days: i64 },
    Week { days: i64 },
    DaysLeft { days: i64 },
    LastHours { hours: i64 },
}

/// Renders countdown phrases from a [`Catalog`].
#[derive(Debug)]
pub struct MessageGenerator {
    catalog: Catalog,
}

impl MessageGenerator {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Classifies the span from `base` to `target`.
    ///
    /// Past targets count whole days ago, rounding up, so even one
    /// second past the date reads as "1 день назад".
    pub fn category_for<Z1: TimeZone, Z2: TimeZone>(
        &self,
        target: DateTime<Z1>,
        base: DateTime<Z2>,
    ) -> Category {
        let ms = clock::diff(target.clone(), base.clone()).num_milliseconds();
        if ms < 0 {
            let ago = -ms;
            let days_ago = ago.div_euclid(MS_PER_DAY) + i64::from(ago.rem_euclid(MS_PER_DAY) > 0);
            return Category::Past { days_ago };
        }

        let days = days_floor(target.clone(), base.clone());
        let hours = hours_ceil(target, base);

        if self.catalog.milestones.contains_key(&days) {
            return Category::Milestone { days };
        }
        if days == 0 {
            if hours <= 24 {
                return Category::HoursToday { hours };
            }
            return Category::Today;
        }
        if days >= 120 {
            return Category::FarFuture;
        }
        if days >= 90 {
            return Category::Quarter { days };
        }
        if days >= 60 {
            return Category::TwoMonths { days };
        }
        if days >= 30 {
            return Category::Month { days };
        }
        if days >= 14 {
            return Category::TwoWeeks { days };
        }
        if days >= 7 {
            return Category::Week { days };
        }
        if days > 0 {
            return Category::DaysLeft { days };
        }
        Category::LastHours { hours }
    }

    /// Picks and interpolates a phrase using the thread-local RNG.
    pub fn generate<Z1: TimeZone, Z2: TimeZone>(
        &self,
        target: DateTime<Z1>,
        base: DateTime<Z2>,
    ) -> String {
        self.generate_with(&mut rand::thread_rng(), target, base)
    }

    /// Same as [`generate`](Self::generate) with a caller-supplied RNG.
    pub fn generate_with<R: Rng, Z1: TimeZone, Z2: TimeZone>(
        &self,
        rng: &mut R,
        target: DateTime<Z1>,
        base: DateTime<Z2>,
    ) -> String {
        let category = self.category_for(target, base);
        self.render(rng, category)
    }

    pub fn render<R: Rng>(&self, rng: &mut R, category: Category) -> String {
        match category {
            Category::Past { days_ago } => self.with_days(rng, &self.catalog.past, days_ago),
            Category::Milestone { days } => {
                let phrases = self
                    .catalog
                    .milestones
                    .get(&days)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                pick(rng, phrases).to_string()
            }
            Category::HoursToday { hours } => {
                self.with_hours(rng, &self.catalog.hours_today, hours)
            }
            Category::Today => pick(rng, &self.catalog.today).to_string(),
            Category::FarFuture => pick(rng, &self.catalog.far_future).to_string(),
            Category::Quarter { days } => self.with_days(rng, &self.catalog.quarter, days),
            Category::TwoMonths { days } => self.with_days(rng, &self.catalog.two_months, days),
            Category::Month { days } => self.with_days(rng, &self.catalog.month, days),
            Category::TwoWeeks { days } => self.with_days(rng, &self.catalog.two_weeks, days),
            Category::Week { days } => self.with_days(rng, &self.catalog.week, days),
            Category::DaysLeft { days } => self.with_days(rng, &self.catalog.days_left, days),
            Category::LastHours { hours } => self.with_hours(rng, &self.catalog.last_hours, hours),
        }
    }

    fn with_days<R: Rng>(&self, rng: &mut R, phrases: &[String], days: i64) -> String {
        let word = self.catalog.day_words.pick(days);
        pick(rng, phrases)
            .replace("{days}", &days.to_string())
            .replace("{day_word}", word)
    }

    fn with_hours<R: Rng>(&self, rng: &mut R, phrases: &[String], hours: i64) -> String {
        let word = self.catalog.hour_words.pick(hours);
        pick(rng, phrases)
            .replace("{hours}", &hours.to_string())
            .replace("{hour_word}", word)
    }
}

fn pick<'a, R: Rng>(rng: &mut R, phrases: &'a [String]) -> &'a str {
    if phrases.is_empty() {
        return "";
    }
    &phrases[rng.gen_range(0..phrases.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> MessageGenerator {
        MessageGenerator::new(Catalog::default())
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
            .single()
            .expect("unambiguous")
    }

    #[test]
    fn test_day_word_follows_russian_plural_rules() {
        let words = PluralWords::new("день", "дня", "дней");
        assert_eq!(words.pick(1), "день");
        assert_eq!(words.pick(2), "дня");
        assert_eq!(words.pick(4), "дня");
        assert_eq!(words.pick(5), "дней");
        assert_eq!(words.pick(11), "дней");
        assert_eq!(words.pick(14), "дней");
        assert_eq!(words.pick(19), "дней");
        assert_eq!(words.pick(21), "день");
        assert_eq!(words.pick(102), "дня");
        assert_eq!(words.pick(111), "дней");
        assert_eq!(words.pick(-3), "дня");
    }

    #[test]
    fn test_past_target_counts_days_ago_rounding_up() {
        let g = generator();
        let b = base();
        assert_eq!(
            g.category_for(b - Duration::hours(60), b),
            Category::Past { days_ago: 3 }
        );
        assert_eq!(
            g.category_for(b - Duration::days(1), b),
            Category::Past { days_ago: 1 }
        );
        assert_eq!(
            g.category_for(b - Duration::seconds(1), b),
            Category::Past { days_ago: 1 }
        );
    }

    #[test]
    fn test_milestones_take_priority_over_range_buckets() {
        let g = generator();
        let b = base();
        for days in [120, 100, 90, 60, 45, 30, 20, 15, 10, 7, 5, 3, 2, 1] {
            assert_eq!(
                g.category_for(b + Duration::days(days), b),
                Category::Milestone { days },
                "day {days} should hit its milestone pool"
            );
        }
    }

    #[test]
    fn test_range_buckets_between_milestones() {
        let g = generator();
        let b = base();
        let cases = [
            (121, Category::FarFuture),
            (119, Category::Quarter { days: 119 }),
            (89, Category::TwoMonths { days: 89 }),
            (59, Category::Month { days: 59 }),
            (29, Category::TwoWeeks { days: 29 }),
            (14, Category::TwoWeeks { days: 14 }),
            (13, Category::Week { days: 13 }),
            (6, Category::DaysLeft { days: 6 }),
            (4, Category::DaysLeft { days: 4 }),
        ];
        for (days, expected) in cases {
            assert_eq!(g.category_for(b + Duration::days(days), b), expected);
        }
    }

    #[test]
    fn test_same_day_targets_use_hour_phrases() {
        let g = generator();
        let b = base();
        assert_eq!(
            g.category_for(b + Duration::hours(5), b),
            Category::HoursToday { hours: 5 }
        );
        assert_eq!(
            g.category_for(b + Duration::minutes(90), b),
            Category::HoursToday { hours: 2 }
        );
        assert_eq!(
            g.category_for(b + Duration::hours(23) + Duration::minutes(30), b),
            Category::HoursToday { hours: 24 }
        );
        assert_eq!(g.category_for(b, b), Category::HoursToday { hours: 0 });
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let g = generator();
        let b = base();
        let target = b + Duration::days(42);
        let first = g.generate_with(&mut StdRng::seed_from_u64(7), target, b);
        let second = g.generate_with(&mut StdRng::seed_from_u64(7), target, b);
        assert_eq!(first, second);
    }

    #[test]
    fn test_phrases_interpolate_count_and_word() {
        let g = generator();
        let b = base();

        let days_text = g.generate_with(&mut StdRng::seed_from_u64(1), b + Duration::days(42), b);
        assert!(days_text.contains("42"), "got: {days_text}");
        assert!(days_text.contains("дня"), "got: {days_text}");
        assert!(!days_text.contains("{days}"));
        assert!(!days_text.contains("{day_word}"));

        let hours_text = g.generate_with(&mut StdRng::seed_from_u64(1), b + Duration::hours(3), b);
        assert!(hours_text.contains('3'), "got: {hours_text}");
        assert!(hours_text.contains("часа"), "got: {hours_text}");
    }

    #[test]
    fn test_far_future_draws_from_fixed_pool() {
        let catalog = Catalog::default();
        let g = MessageGenerator::new(catalog.clone());
        let b = base();
        let text = g.generate_with(&mut StdRng::seed_from_u64(3), b + Duration::days(200), b);
        assert!(catalog.far_future.contains(&text));
    }

    #[test]
    fn test_milestone_phrases_are_verbatim() {
        let catalog = Catalog::default();
        let g = MessageGenerator::new(catalog.clone());
        let b = base();
        let text = g.generate_with(&mut StdRng::seed_from_u64(5), b + Duration::days(30), b);
        assert!(catalog.milestones[&30].contains(&text));
    }

    #[test]
    fn test_today_and_trailing_hour_phrases_render() {
        let catalog = Catalog::default();
        let g = MessageGenerator::new(catalog.clone());

        let today = g.render(&mut StdRng::seed_from_u64(0), Category::Today);
        assert!(catalog.today.contains(&today));

        let last = g.render(&mut StdRng::seed_from_u64(0), Category::LastHours { hours: 2 });
        assert!(last.contains('2'), "got: {last}");
        assert!(last.contains("часа"), "got: {last}");
    }
}
