use super::*;
use crate::error::ErrorKind;

fn catalog() -> VoiceCatalog {
    VoiceCatalog::builtin().unwrap()
}

fn voice(id: &str) -> Voice {
    Voice {
        id: id.to_string(),
        name: id.to_string(),
        language: "zh".to_string(),
        description: None,
        tags: Vec::new(),
    }
}

#[test]
fn test_builtin_catalog_loads() {
    let catalog = catalog();
    assert_eq!(catalog.standard_voices().preset.len(), 5);
    assert_eq!(catalog.voices(true).preset.len(), 12);
    assert_eq!(catalog.len(), 12);
}

#[test]
fn test_model_resolution() {
    let catalog = catalog();
    assert_eq!(
        catalog.model_for_voice("v-female-R2s4N9qJ").unwrap(),
        VoiceModel::Turbo
    );
    assert_eq!(
        catalog.model_for_voice("male-qn-qingse").unwrap(),
        VoiceModel::Extended
    );

    let err = catalog.model_for_voice("not-a-voice").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownVoice);
    assert!(err.to_string().contains("not-a-voice"));

    // Ids are matched exactly
    assert!(catalog.model_for_voice("V-FEMALE-R2S4N9QJ").is_err());
}

#[test]
fn test_model_names() {
    assert_eq!(VoiceModel::Turbo.as_str(), "flow_01_turbo");
    assert_eq!(VoiceModel::Extended.to_string(), "flow_01_ex");
}

#[test]
fn test_voice_lookup() {
    let catalog = catalog();
    let gentle = catalog.voice("v-female-R2s4N9qJ").unwrap();
    assert_eq!(gentle.name, "温柔姐姐");
    assert!(catalog.voice("female-shaonv").is_some());
    assert!(catalog.voice("missing").is_none());
}

#[test]
fn test_fallback_is_first_turbo_voice() {
    let catalog = catalog();
    assert_eq!(catalog.fallback_voice().id, "v-female-R2s4N9qJ");
    assert_eq!(
        catalog.standard_voices().preset[0],
        *catalog.fallback_voice()
    );
}

#[test]
fn test_voices_order_turbo_first() {
    let catalog = catalog();
    let all = catalog.voices(true).preset;
    let turbo = catalog.standard_voices().preset;
    assert_eq!(&all[..turbo.len()], &turbo[..]);
    assert!(
        all[turbo.len()..]
            .iter()
            .all(|voice| catalog.model_for_voice(&voice.id).unwrap() == VoiceModel::Extended)
    );
}

#[test]
fn test_search_is_case_insensitive() {
    let catalog = catalog();

    let gentle = catalog.search("GENTLE", true);
    assert_eq!(gentle.len(), 1);
    assert_eq!(gentle[0].id, "v-female-R2s4N9qJ");

    let by_name = catalog.search("温柔", false);
    assert_eq!(by_name[0].id, "v-female-R2s4N9qJ");

    assert!(catalog.search("nothing matches this", true).is_empty());
}

#[test]
fn test_search_respects_include_extended() {
    let catalog = catalog();
    let with_extended = catalog.search("sweet", true);
    assert!(with_extended.iter().any(|voice| voice.id == "female-tianmei"));
    assert!(catalog.search("sweet", false).is_empty());
}

#[test]
fn test_openai_aliases() {
    assert_eq!(resolve_alias("alloy"), Some("v-male-W1tH9jVc"));
    assert_eq!(resolve_alias("ALLOY"), Some("v-male-W1tH9jVc"));
    assert_eq!(resolve_alias("Shimmer"), Some("v-female-m1KpW7zE"));
    assert_eq!(resolve_alias("v-female-R2s4N9qJ"), None);

    // Every alias targets a turbo voice in the builtin catalog
    let catalog = catalog();
    for (_, id) in OPENAI_VOICE_ALIASES {
        assert_eq!(catalog.model_for_voice(id).unwrap(), VoiceModel::Turbo);
    }
}

#[test]
fn test_rejects_duplicate_ids() {
    let err = VoiceCatalog::new(vec![voice("a")], vec![voice("b"), voice("a")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_rejects_empty_turbo_set() {
    let err = VoiceCatalog::new(Vec::new(), vec![voice("b")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_from_json_rejects_malformed_data() {
    let err = VoiceCatalog::from_json("{\"voices\": 3}", "{\"voices\": []}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
