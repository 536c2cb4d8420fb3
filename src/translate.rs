//! The per-document translation pass and its cache lifecycle.
//!
//! A [`Translator`] owns everything keyed by (scenario, language): loaded
//! translation tables, attribute maps, the character-name dictionary, the
//! per-scenario table pointer and missing-string set. All of it lives until
//! an explicit language switch, which is the one global invalidation point.

use ahash::{AHashMap, AHashSet};

use crate::config::Config;
use crate::locate::{find_translation, original_strings_set};
use crate::node::{Scenario, ScenarioParser};
use crate::normalize::normalize;
use crate::patch::apply_translation;
use crate::storage::Storage;
use crate::table::{decode_dict, decode_rows, TranslationEntry};

/// One patch-induced change to the node count, recorded at the index where
/// it happened. Labels are re-recorded during the pass itself; this log is
/// for callers that keep their own indices into the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetChange {
    pub node_index: usize,
    pub delta: isize,
}

/// Returned by a language switch: every cached table was dropped, so
/// anything already rendered from them is stale.
#[must_use = "a language switch invalidates rendered text; the embedder should refresh its UI"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshUi;

#[derive(Debug)]
pub struct Translator {
    config: Config,
    storage: Box<dyn Storage>,
    parser: Box<dyn ScenarioParser>,
    strings: AHashMap<String, Vec<TranslationEntry>>,
    attributes: AHashMap<String, AHashMap<String, String>>,
    characters: AHashMap<String, String>,
    images: AHashMap<String, String>,
    loaded_files: AHashSet<String>,
    pointers: AHashMap<String, usize>,
    missing: AHashMap<String, AHashSet<String>>,
}

impl Translator {
    pub fn new(
        config: Config,
        storage: Box<dyn Storage>,
        parser: Box<dyn ScenarioParser>,
    ) -> Self {
        let mut translator = Translator {
            config,
            storage,
            parser,
            strings: AHashMap::new(),
            attributes: AHashMap::new(),
            characters: AHashMap::new(),
            images: AHashMap::new(),
            loaded_files: AHashSet::new(),
            pointers: AHashMap::new(),
            missing: AHashMap::new(),
        };
        translator.load_character_table();
        translator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Normalized strings that had no usable translation in past passes
    /// over this scenario.
    pub fn missing_strings(&self, scenario_name: &str) -> Option<&AHashSet<String>> {
        self.missing.get(scenario_name)
    }

    /// Switch the active language. Clears every per-scenario cache and
    /// reloads the character table; the caller-owned node sequences are
    /// untouched.
    pub fn switch_language(&mut self, language: &str) -> RefreshUi {
        tracing::debug!("switching language to {language:?}");
        self.config.current_language = language.to_string();
        self.strings.clear();
        self.attributes.clear();
        self.characters.clear();
        self.images.clear();
        self.loaded_files.clear();
        self.pointers.clear();
        self.missing.clear();
        self.load_character_table();
        RefreshUi
    }

    /// Run one linear translation pass over the scenario, patching text
    /// nodes in place and keeping the label map aligned with the sequence
    /// as splices move nodes around.
    pub fn translate_scenario(&mut self, scenario: &mut Scenario) -> Vec<OffsetChange> {
        let mut offsets = Vec::new();
        if !self.config.enabled {
            return offsets;
        }
        self.load_tables(&scenario.name);

        let translations = self.strings.get(&scenario.name).cloned().unwrap_or_default();
        let attributes = self.attributes.get(&scenario.name).cloned().unwrap_or_default();
        if translations.is_empty() && attributes.is_empty() && self.characters.is_empty() {
            return offsets;
        }

        let parser = self.parser.as_ref();
        let originals = original_strings_set(&translations, parser);
        let style = self.config.wrap_style();
        let mut pointer = self.pointers.get(&scenario.name).copied().unwrap_or(0);
        let mut missing = self.missing.remove(&scenario.name).unwrap_or_default();

        let mut in_script = false;
        let mut i = 0;
        while i < scenario.nodes.len() {
            let tag = scenario.nodes[i].tag.clone();
            match tag.as_str() {
                "iscript" => in_script = true,
                "endscript" => in_script = false,
                "label" => {
                    // re-record the index: earlier splices may have moved it
                    let node = &mut scenario.nodes[i];
                    node.params.insert("index".to_string(), i.to_string());
                    if let Some(label_name) = node.param("label_name").map(str::to_string) {
                        if scenario.labels.contains_key(&label_name) {
                            scenario.labels.insert(label_name, i);
                        } else {
                            tracing::warn!(
                                "unknown label {label_name} in {}",
                                scenario.name
                            );
                        }
                    }
                }
                "text" if !in_script => {
                    let text = normalize(&scenario.nodes[i].val);
                    if text.is_empty() {
                        // nothing displayable
                    } else if translations.is_empty() {
                        if missing.insert(text.clone()) {
                            tracing::debug!(
                                "no translations available for {text:?} in {}",
                                scenario.name
                            );
                        }
                    } else if !originals.contains(&text) {
                        if missing.insert(text.clone()) {
                            tracing::debug!(
                                "no translation entry for {text:?} in {}",
                                scenario.name
                            );
                        }
                    } else if let Some(found) =
                        find_translation(&text, &translations, pointer, parser)
                    {
                        let outcome = apply_translation(
                            &mut scenario.nodes,
                            i,
                            &translations[found],
                            parser,
                            &style,
                        );
                        if outcome.delta != 0 {
                            offsets.push(OffsetChange { node_index: i, delta: outcome.delta });
                        }
                        pointer = found + 1;
                        i = outcome.resume;
                        continue;
                    } else if missing.insert(text.clone()) {
                        tracing::debug!("no match for {text:?} in {}", scenario.name);
                    }
                }
                // script-mode text is code, not prose
                "text" => {}
                "chara_ptext" => {
                    if let Some(name) = scenario.nodes[i].param("name").map(str::to_string) {
                        if let Some(translated) = self.characters.get(&name) {
                            scenario.nodes[i]
                                .params
                                .insert("name".to_string(), translated.clone());
                        }
                    }
                }
                "eval" => {
                    if let Some(exp) = scenario.nodes[i].param("exp").map(str::to_string) {
                        if let Some(translated) = attributes.get(&exp) {
                            tracing::debug!("{exp} -> {translated} @{i}");
                            scenario.nodes[i]
                                .params
                                .insert("exp".to_string(), translated.clone());
                        }
                    }
                }
                _ => {
                    // any parameter value that is an exact attribute key
                    // gets substituted
                    for value in scenario.nodes[i].params.values_mut() {
                        if let Some(translated) = attributes.get(value.as_str()) {
                            *value = translated.clone();
                        }
                    }
                }
            }
            i += 1;
        }

        self.pointers.insert(scenario.name.clone(), pointer);
        self.missing.insert(scenario.name.clone(), missing);
        offsets
    }

    /// Resolve a per-language replacement for an image path, if one exists
    /// under the configured translation folder. Positive results are cached.
    pub fn translate_image_path(&mut self, path: &str, directory: &str) -> String {
        if path.is_empty() {
            return path.to_string();
        }
        if let Some(cached) = self.images.get(path) {
            return cached.clone();
        }

        let folder = path.split('/').next().unwrap_or_default();
        let mut dir_parts = directory.split('/');
        let folder_base = match (dir_parts.next(), dir_parts.next()) {
            (Some("data"), Some(second)) => second,
            _ => "data",
        };
        let allowed = |f: &str| self.config.image_folders.iter().any(|allow| allow == f);
        if !allowed(folder) && !allowed(folder_base) {
            return path.to_string();
        }

        let translated_folder =
            format!("{}{}", self.config.translation_folder, self.config.lang_suffix());
        let translated = match path.rfind('/') {
            Some(pos) => {
                format!("{}{translated_folder}/{}", &path[..=pos], &path[pos + 1..])
            }
            None => format!("{translated_folder}/{path}"),
        };
        let full_path = if directory.is_empty() {
            translated.clone()
        } else {
            format!("{directory}/{translated}")
        };
        if self.storage.exists(&full_path) {
            tracing::debug!("replaced image {path} with {translated}");
            self.images.insert(path.to_string(), translated.clone());
            translated
        } else {
            path.to_string()
        }
    }

    /// Lazily load the scenario's string and attribute tables. Each path is
    /// attempted at most once per language; failures leave the tables empty
    /// so the scenario plays untranslated.
    fn load_tables(&mut self, scenario_name: &str) {
        let suffix = self.config.lang_suffix();
        let stem = scenario_name.strip_suffix(".ks").unwrap_or(scenario_name);
        let folder = &self.config.scenario_folder;
        let strings_path = format!("{folder}/{stem}_strings{suffix}.csv");
        let attributes_path = format!("{folder}/{stem}_attributes{suffix}.csv");

        if !self.loaded_files.contains(&strings_path) && self.storage.exists(&strings_path) {
            let text = self.storage.read_text(&strings_path);
            if text.is_empty() {
                tracing::warn!("could not load string translations from {strings_path}");
            } else {
                let rows = decode_rows(&text);
                tracing::debug!(
                    "loaded {} string translations for {scenario_name}",
                    rows.len()
                );
                self.strings.insert(scenario_name.to_string(), rows);
            }
            self.loaded_files.insert(strings_path);
        }

        if !self.loaded_files.contains(&attributes_path)
            && self.storage.exists(&attributes_path)
        {
            let text = self.storage.read_text(&attributes_path);
            if text.is_empty() {
                tracing::warn!("could not load attribute translations from {attributes_path}");
            } else {
                let dict = decode_dict(&text);
                tracing::debug!(
                    "loaded {} attribute translations for {scenario_name}",
                    dict.len()
                );
                self.attributes.insert(scenario_name.to_string(), dict);
            }
            self.loaded_files.insert(attributes_path);
        }
    }

    fn load_character_table(&mut self) {
        let path = format!(
            "{}/characters{}.csv",
            self.config.scenario_folder,
            self.config.lang_suffix()
        );
        if self.loaded_files.contains(&path) {
            return;
        }
        if !self.storage.exists(&path) {
            tracing::debug!("no character translations at {path}");
            return;
        }
        let text = self.storage.read_text(&path);
        if text.is_empty() {
            tracing::warn!("could not load character translations from {path}");
        } else {
            self.characters = decode_dict(&text);
            tracing::debug!("loaded {} character translations", self.characters.len());
        }
        self.loaded_files.insert(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::KagParser;

    #[derive(Clone, Debug, Default)]
    struct MemStorage {
        files: AHashMap<String, String>,
    }

    impl MemStorage {
        fn with(files: &[(&str, &str)]) -> Self {
            let files = files
                .iter()
                .map(|(path, content)| ((*path).to_string(), (*content).to_string()))
                .collect();
            MemStorage { files }
        }
    }

    impl Storage for MemStorage {
        fn exists(&self, path: &str) -> bool {
            self.files.contains_key(path)
        }

        fn read_text(&self, path: &str) -> String {
            self.files.get(path).cloned().unwrap_or_default()
        }
    }

    fn translator(files: &[(&str, &str)]) -> Translator {
        Translator::new(
            Config::default(),
            Box::new(MemStorage::with(files)),
            Box::new(KagParser),
        )
    }

    #[test]
    fn test_end_to_end_pass() {
        let mut translator =
            translator(&[("data/scenario/scene1_strings.csv", "Hello→Bonjour\n")]);
        let mut scenario =
            Scenario::from_source("scene1.ks", "*start\nHello\n*end\n", &KagParser);

        let offsets = translator.translate_scenario(&mut scenario);
        assert!(offsets.is_empty());
        assert_eq!(scenario.nodes[1].val, "Bonjour");
        assert_eq!(scenario.label_index("start"), Some(0));
        assert_eq!(scenario.label_index("end"), Some(2));
        assert!(translator.missing_strings("scene1.ks").is_some_and(|s| s.is_empty()));
    }

    #[test]
    fn test_labels_track_splices() {
        let mut translator = Translator::new(
            Config { width: 60, ..Config::default() },
            Box::new(MemStorage::with(&[(
                "data/scenario/s_strings.csv",
                "Hello→aaaa bbbb cccc\n",
            )])),
            Box::new(KagParser),
        );
        let mut scenario = Scenario::from_source("s.ks", "*top\nHello\n*after\n", &KagParser);

        let offsets = translator.translate_scenario(&mut scenario);
        assert_eq!(offsets, vec![OffsetChange { node_index: 1, delta: 2 }]);
        assert_eq!(scenario.nodes.len(), 5);
        // the label after the spliced text shifted by exactly the delta
        assert_eq!(scenario.label_index("top"), Some(0));
        assert_eq!(scenario.label_index("after"), Some(4));
        assert_eq!(scenario.nodes[4].param("index"), Some("4"));
    }

    #[test]
    fn test_script_mode_text_untouched() {
        let mut translator =
            translator(&[("data/scenario/s_strings.csv", "f.x = 1→nonsense\n")]);
        let source = "[iscript]\nf.x = 1\n[endscript]\n";
        let mut scenario = Scenario::from_source("s.ks", source, &KagParser);

        translator.translate_scenario(&mut scenario);
        assert_eq!(scenario.nodes[1].val, "f.x = 1");
    }

    #[test]
    fn test_missing_strings_are_recorded_once() {
        let mut translator =
            translator(&[("data/scenario/s_strings.csv", "known→connu\n")]);
        let mut scenario =
            Scenario::from_source("s.ks", "mystery\nknown\nmystery\n", &KagParser);

        translator.translate_scenario(&mut scenario);
        assert_eq!(scenario.nodes[1].val, "connu");
        let missing = translator.missing_strings("s.ks").unwrap();
        assert_eq!(missing.len(), 1);
        assert!(missing.contains("mystery"));
    }

    #[test]
    fn test_eval_and_attribute_substitution() {
        let files = [(
            "data/scenario/s_attributes.csv",
            "f.score+=1→f.score+=2\nok.png→ok_en.png\n",
        )];
        let mut translator = translator(&files);
        let source = "@eval exp=\"f.score+=1\"\n[button graphic=\"ok.png\"]\n";
        let mut scenario = Scenario::from_source("s.ks", source, &KagParser);

        translator.translate_scenario(&mut scenario);
        assert_eq!(scenario.nodes[0].param("exp"), Some("f.score+=2"));
        assert_eq!(scenario.nodes[1].param("graphic"), Some("ok_en.png"));
    }

    #[test]
    fn test_chara_ptext_name_substitution() {
        let mut translator =
            translator(&[("data/scenario/characters.csv", "さくら→Sakura\n")]);
        let mut scenario =
            Scenario::from_source("s.ks", "[chara_ptext name=さくら]\n", &KagParser);

        translator.translate_scenario(&mut scenario);
        // no string/attribute tables: the pass must still run for characters
        assert_eq!(scenario.nodes[0].param("name"), Some("Sakura"));
    }

    #[test]
    fn test_language_switch_resets_caches() {
        let files = [
            ("data/scenario/s_strings.csv", "Hello→Bonjour\n"),
            ("data/scenario/s_strings_en.csv", "Hello→Howdy\n"),
        ];
        let mut translator = translator(&files);

        let mut scenario = Scenario::from_source("s.ks", "Hello\n", &KagParser);
        translator.translate_scenario(&mut scenario);
        assert_eq!(scenario.nodes[0].val, "Bonjour");

        let RefreshUi = translator.switch_language("en");
        let mut scenario = Scenario::from_source("s.ks", "Hello\n", &KagParser);
        translator.translate_scenario(&mut scenario);
        assert_eq!(scenario.nodes[0].val, "Howdy");
    }

    #[test]
    fn test_unreadable_table_leaves_scenario_untranslated() {
        // exists() is true but the read comes back empty: load failure
        let mut translator = translator(&[("data/scenario/s_strings.csv", "")]);
        let mut scenario = Scenario::from_source("s.ks", "Hello\n", &KagParser);

        let offsets = translator.translate_scenario(&mut scenario);
        assert!(offsets.is_empty());
        assert_eq!(scenario.nodes[0].val, "Hello");
    }

    #[test]
    fn test_image_path_translation() {
        let mut translator = translator(&[
            ("data/fgimage/translated/face.png", "png"),
            ("data/scenario/s_strings.csv", "x→y\n"),
        ]);
        assert_eq!(
            translator.translate_image_path("face.png", "data/fgimage"),
            "translated/face.png"
        );
        // cached on the second call
        assert_eq!(
            translator.translate_image_path("face.png", "data/fgimage"),
            "translated/face.png"
        );
        // folder not in the allowlist
        assert_eq!(translator.translate_image_path("other/face.png", ""), "other/face.png");
    }
}
