//! Built-in Russian phrase catalog.
//!
//! Every countdown tier keeps several interchangeable phrases; the
//! generator picks one at random so the profile text does not go stale.

use std::collections::BTreeMap;

/// Inflected noun forms for Russian counts.
#[derive(Debug, Clone)]
pub struct PluralWords {
    pub one: String,
    pub few: String,
    pub many: String,
}

impl PluralWords {
    pub fn new(one: &str, few: &str, many: &str) -> Self {
        Self {
            one: one.to_string(),
            few: few.to_string(),
            many: many.to_string(),
        }
    }

    /// Selects the noun form for a count (1 день, 2 дня, 5 дней).
    pub fn pick(&self, n: i64) -> &str {
        let num = n.unsigned_abs();
        let (d10, d100) = (num % 10, num % 100);
        // 11..=14 always take the many form.
        if d10 == 1 && d100 != 11 {
            &self.one
        } else if (2..=4).contains(&d10) && !(10..20).contains(&d100) {
            &self.few
        } else {
            &self.many
        }
    }
}

/// Phrase pools for every countdown tier.
///
/// Templates may reference `{days}`, `{day_word}`, `{hours}` and
/// `{hour_word}`; the generator substitutes them before publishing.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub past: Vec<String>,
    pub far_future: Vec<String>,
    pub quarter: Vec<String>,
    pub two_months: Vec<String>,
    pub month: Vec<String>,
    pub two_weeks: Vec<String>,
    pub week: Vec<String>,
    pub days_left: Vec<String>,
    pub today: Vec<String>,
    pub hours_today: Vec<String>,
    pub last_hours: Vec<String>,
    /// Fixed phrases for specific day counts, checked before the range tiers.
    pub milestones: BTreeMap<i64, Vec<String>>,
    pub day_words: PluralWords,
    pub hour_words: PluralWords,
}

fn family(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|s| s.to_string()).collect()
}

impl Default for Catalog {
    fn default() -> Self {
        let mut milestones = BTreeMap::new();
        milestones.insert(
            120,
            family(&[
                "⏳ 120 дней — держимся! 💼",
                "120 до солнца — планирую маршрут 🗺️",
            ]),
        );
        milestones.insert(
            100,
            family(&["💪 100 дней — сотка до моря!", "100 дней до тропиков 🌴"]),
        );
        milestones.insert(
            90,
            family(&["🎯 90 дней — квартал ожидания!", "Ещё 90 — и волны зовут 🌊"]),
        );
        milestones.insert(
            60,
            family(&[
                "📆 60 дней — два месяца!",
                "Минус два месяца — 60 до вылета ✈️",
            ]),
        );
        milestones.insert(
            45,
            family(&[
                "🧳 45 — начинаю чек-лист вещей",
                "45 дней — подготовка в разгаре",
            ]),
        );
        milestones.insert(
            30,
            family(&["📅 Ровно месяц до отпуска! 🌴", "30 дней до рая в Паттайе! 🏖️"]),
        );
        milestones.insert(
            20,
            family(&[
                "🕰️ 20 дней осталось! Чемоданы готовы? ✈️",
                "Двадцать дней до солнца и моря! ☀️",
            ]),
        );
        milestones.insert(
            15,
            family(&["🚀 Полмесяца до отпуска! 🌊", "15 дней — и я в Паттайе! 🌺"]),
        );
        milestones.insert(
            10,
            family(&[
                "🔥 Осталось 10 дней! Набираю скорость!",
                "Десять дней до приключений! 🏄‍♂️",
            ]),
        );
        milestones.insert(
            7,
            family(&[
                "✈️ Неделя до отпуска! Готовимся к релаксу!",
                "7 дней — и привет, пляжи! 🏝️",
            ]),
        );
        milestones.insert(
            5,
            family(&[
                "🚀 Осталось 5 дней! Пора паковать чемодан!",
                "Пять пальцев — пять дней ✋",
            ]),
        );
        milestones.insert(
            3,
            family(&["🎉 Уже пахнет морем! 3 дня!", "Три дня до свободы! 🌅"]),
        );
        milestones.insert(
            2,
            family(&["✌️ Два дня — и отпуск! 🛫", "Послезавтра — взлёт! 🔜"]),
        );
        milestones.insert(
            1,
            family(&["✈️ Завтра — отпуск! Ура!", "Один день до рая! 😎"]),
        );

        Self {
            past: family(&[
                "Отпуск был {days} {day_word} назад… 😢",
                "Уже {days} {day_word} после отпуска. Воспоминания греют!",
                "Прошло {days} {day_word} с отпуска. Когда следующий?",
                "Погружаюсь в фото — {days} {day_word} после рая 📸",
            ]),
            far_future: family(&[
                "🌍 Мечтаю о море… 120+ дней осталось",
                "Ещё далеко, но отпуск ждёт! ⏳",
            ]),
            quarter: family(&[
                "⏳ Квартал ожидания — {days} {day_word}",
                "{days} {day_word} до тропиков — держусь!",
            ]),
            two_months: family(&[
                "📆 Два месяца+ — {days} {day_word}",
                "{days} {day_word} — и я в тропиках! 🏝️",
            ]),
            month: family(&[
                "📅 Месяц+ — {days} {day_word}",
                "{days} {day_word} до солнца и моря! ☀️",
            ]),
            two_weeks: family(&[
                "🌴 Две недели+ — {days} {day_word}",
                "{days} {day_word} — отпуск на подходе! 🚀",
            ]),
            week: family(&[
                "✈️ Неделя+ — {days} {day_word}",
                "{days} {day_word} — и я в раю! 🏖️",
            ]),
            days_left: family(&[
                "🔥 Осталось {days} {day_word}",
                "Ещё {days} {day_word} до приключений! 🌴",
                "{days} {day_word} countdown! ⏰",
            ]),
            today: family(&["✈️ Сегодня — отпуск! Вперёд!", "День отпуска настал! 🌞"]),
            hours_today: family(&[
                "⏰ Осталось {hours} {hour_word}! Почти там!",
                "Тик-так: {hours} {hour_word} до вылёта! 🛩️",
            ]),
            last_hours: family(&[
                "⏰ Почти там! {hours} {hour_word}",
                "Финальный отсчёт: {hours} {hour_word}! 🛫",
            ]),
            milestones,
            day_words: PluralWords::new("день", "дня", "дней"),
            hour_words: PluralWords::new("час", "часа", "часов"),
        }
    }
}
