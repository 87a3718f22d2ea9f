//! Locale-keyed merging of listing records.
//!
//! App Store Connect spreads a listing across two relationship collections:
//! app-info localizations (name, subtitle, privacy URLs) and the live
//! version's localizations (description, keywords, ...). [`LocaleMerger`]
//! folds both streams into one [`LocalizationMetadata`] per locale.
//!
//! Entries are get-or-create by locale and each insert replaces the whole
//! section it targets. Output order is the order in which locales were
//! first seen.

use std::collections::HashMap;

use crate::{AppInfoData, LocalizationMetadata, VersionData};

/// Accumulates per-locale listing sections.
#[derive(Debug, Default)]
pub struct LocaleMerger {
    entries: Vec<LocalizationMetadata>,
    index: HashMap<String, usize>,
}

impl LocaleMerger {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the app-info section for a locale, replacing any previous one.
    pub fn insert_app_info(&mut self, locale: &str, app_info: AppInfoData) {
        self.entry(locale).app_info = Some(app_info);
    }

    /// Sets the version section for a locale, replacing any previous one.
    pub fn insert_version(&mut self, locale: &str, version: VersionData) {
        self.entry(locale).version = Some(version);
    }

    /// Number of distinct locales seen so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the merger, returning localizations in first-seen order.
    pub fn into_localizations(self) -> Vec<LocalizationMetadata> {
        self.entries
    }

    fn entry(&mut self, locale: &str) -> &mut LocalizationMetadata {
        let idx = match self.index.get(locale) {
            Some(&idx) => idx,
            None => {
                self.entries.push(LocalizationMetadata::new(locale));
                let idx = self.entries.len() - 1;
                self.index.insert(locale.to_string(), idx);
                idx
            }
        };
        &mut self.entries[idx]
    }
}

/// Merges app-info and version records into one localization per locale.
pub fn merge_localizations<A, V>(app_infos: A, versions: V) -> Vec<LocalizationMetadata>
where
    A: IntoIterator<Item = (String, AppInfoData)>,
    V: IntoIterator<Item = (String, VersionData)>,
{
    let mut merger = LocaleMerger::new();
    for (locale, app_info) in app_infos {
        merger.insert_app_info(&locale, app_info);
    }
    for (locale, version) in versions {
        merger.insert_version(&locale, version);
    }
    merger.into_localizations()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn app_info(name: &str) -> AppInfoData {
        AppInfoData {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn version(description: &str) -> VersionData {
        VersionData {
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merges_sections_by_locale() {
        let merged = merge_localizations(
            vec![
                ("en-US".to_string(), app_info("Foo")),
                ("de-DE".to_string(), app_info("Fu")),
            ],
            vec![("en-US".to_string(), version("Desc"))],
        );

        assert_eq!(merged.len(), 2);

        let en = &merged[0];
        assert_eq!(en.locale, "en-US");
        assert_eq!(en.app_info.as_ref().unwrap().name.as_deref(), Some("Foo"));
        assert_eq!(en.version.as_ref().unwrap().description.as_deref(), Some("Desc"));

        let de = &merged[1];
        assert_eq!(de.locale, "de-DE");
        assert_eq!(de.app_info.as_ref().unwrap().name.as_deref(), Some("Fu"));
        assert!(de.version.is_none());

        let json = serde_json::to_value(de).unwrap();
        assert!(json.get("version").is_none());
    }

    #[test]
    fn test_second_record_replaces_whole_section() {
        let mut merger = LocaleMerger::new();
        merger.insert_app_info(
            "en-US",
            AppInfoData {
                name: Some("Old".to_string()),
                subtitle: Some("Old subtitle".to_string()),
                ..Default::default()
            },
        );
        merger.insert_app_info("en-US", app_info("New"));

        let merged = merger.into_localizations();
        assert_eq!(merged.len(), 1);
        let info = merged[0].app_info.as_ref().unwrap();
        assert_eq!(info.name.as_deref(), Some("New"));
        assert!(info.subtitle.is_none());
    }

    #[test]
    fn test_version_only_locale_is_kept() {
        let merged = merge_localizations(
            Vec::new(),
            vec![("fr-FR".to_string(), version("Description"))],
        );

        assert_eq!(merged.len(), 1);
        assert!(merged[0].app_info.is_none());
        assert!(merged[0].version.is_some());
    }

    #[test]
    fn test_empty_inputs() {
        let merger = LocaleMerger::new();
        assert!(merger.is_empty());
        assert!(merge_localizations(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_first_seen_order() {
        let mut merger = LocaleMerger::new();
        merger.insert_version("ja", version("a"));
        merger.insert_app_info("en-US", app_info("b"));
        merger.insert_app_info("ja", app_info("c"));

        assert_eq!(merger.len(), 2);
        let locales: Vec<_> = merger
            .into_localizations()
            .into_iter()
            .map(|l| l.locale)
            .collect();
        assert_eq!(locales, vec!["ja", "en-US"]);
    }

    fn locale_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["en-US", "de-DE", "fr-FR", "ja", "pt-BR", "zh-Hans"])
            .prop_map(str::to_string)
    }

    fn records<T: std::fmt::Debug>(
        value: impl Strategy<Value = T>,
    ) -> impl Strategy<Value = Vec<(String, T)>> {
        prop::collection::vec((locale_strategy(), value), 0..8)
    }

    fn sorted(mut locs: Vec<LocalizationMetadata>) -> Vec<LocalizationMetadata> {
        locs.sort_by(|a, b| a.locale.cmp(&b.locale));
        locs
    }

    proptest! {
        #[test]
        fn prop_one_entry_per_distinct_locale(
            infos in records("[a-z]{0,6}".prop_map(|s| app_info(&s))),
            versions in records("[a-z]{0,6}".prop_map(|s| version(&s))),
        ) {
            let distinct: HashSet<String> = infos
                .iter()
                .map(|(l, _)| l.clone())
                .chain(versions.iter().map(|(l, _)| l.clone()))
                .collect();

            let merged = merge_localizations(infos, versions);
            let seen: HashSet<String> = merged.iter().map(|l| l.locale.clone()).collect();

            prop_assert_eq!(merged.len(), distinct.len());
            prop_assert_eq!(seen, distinct);
        }

        #[test]
        fn prop_merge_order_does_not_change_result(
            infos in records("[a-z]{0,6}".prop_map(|s| app_info(&s))),
            versions in records("[a-z]{0,6}".prop_map(|s| version(&s))),
        ) {
            let forward = merge_localizations(infos.clone(), versions.clone());

            let mut merger = LocaleMerger::new();
            for (locale, v) in versions {
                merger.insert_version(&locale, v);
            }
            for (locale, i) in infos {
                merger.insert_app_info(&locale, i);
            }
            let reverse = merger.into_localizations();

            prop_assert_eq!(sorted(forward), sorted(reverse));
        }
    }
}
