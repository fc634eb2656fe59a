// Webhook payload and classifier rule tests

use chrono::NaiveDate;
use ledgerchat::agent::rules;
use ledgerchat::db::repositories::transaction::{Category, Kind};
use ledgerchat::webhook::InboundEvent;

const TEXT_EVENT: &str = r#"{
    "instance": "personal",
    "data": {
        "key": { "remoteJid": "5511999990000@s.whatsapp.net", "fromMe": false },
        "pushName": "Ana",
        "messageType": "conversation",
        "message": { "conversation": "spent 30 on groceries" }
    }
}"#;

const AUDIO_EVENT: &str = r#"{
    "instance": "personal",
    "data": {
        "key": { "remoteJid": "5511999990000@s.whatsapp.net", "fromMe": false },
        "messageType": "audioMessage",
        "message": {
            "audioMessage": { "url": "https://cdn.example.com/a.ogg", "mimetype": "audio/ogg" }
        }
    }
}"#;

#[test]
fn test_parse_text_event() {
    let event = InboundEvent::parse(TEXT_EVENT).unwrap();

    assert_eq!(event.instance, "personal");
    assert_eq!(event.data.key.remote_jid, "5511999990000@s.whatsapp.net");
    assert!(!event.data.key.from_me);
    assert_eq!(event.data.push_name.as_deref(), Some("Ana"));
    assert_eq!(event.data.message_type.as_deref(), Some("conversation"));
    assert_eq!(event.data.message.conversation, "spent 30 on groceries");
    assert!(event.data.message.audio.is_none());
    assert!(event.data.message.image.is_none());
}

#[test]
fn test_parse_audio_event() {
    let event = InboundEvent::parse(AUDIO_EVENT).unwrap();

    let audio = event.data.message.audio.unwrap();
    assert_eq!(audio.url.as_deref(), Some("https://cdn.example.com/a.ogg"));
    assert_eq!(audio.mime_type.as_deref(), Some("audio/ogg"));
    // Conversation text is absent for pure media messages
    assert!(event.data.message.conversation.is_empty());
}

#[test]
fn test_parse_own_message_flag() {
    let raw = TEXT_EVENT.replace(r#""fromMe": false"#, r#""fromMe": true"#);
    let event = InboundEvent::parse(&raw).unwrap();
    assert!(event.data.key.from_me);
}

#[test]
fn test_missing_message_is_rejected() {
    let raw = r#"{ "instance": "personal", "data": { "key": { "remoteJid": "x" } } }"#;
    assert!(InboundEvent::parse(raw).is_err());
}

#[test]
fn test_unknown_fields_are_ignored() {
    let raw = r#"{
        "instance": "personal",
        "event": "messages-upsert",
        "data": {
            "key": { "remoteJid": "x", "fromMe": false, "id": "ABCDEF" },
            "pushName": "Bo",
            "message": { "conversation": "hi", "contextInfo": { "mentioned": [] } },
            "messageTimestamp": 1760000000
        }
    }"#;
    let event = InboundEvent::parse(raw).unwrap();
    assert_eq!(event.data.message.conversation, "hi");
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
}

#[test]
fn test_rules_expense_with_category_keyword() {
    let tx = rules::classify("I spent 20 on pet food", today()).unwrap();
    assert_eq!(tx.kind, Kind::Liability);
    assert_eq!(tx.category, Category::Home);
    assert_eq!(tx.amount, 20.0);
    assert_eq!(tx.date, None);
}

#[test]
fn test_rules_expense_defaults_to_shopping() {
    let tx = rules::classify("bought a razor for 84", today()).unwrap();
    assert_eq!(tx.kind, Kind::Liability);
    assert_eq!(tx.category, Category::Shopping);
    assert_eq!(tx.amount, 84.0);
}

#[test]
fn test_rules_income_always_income_category() {
    let tx = rules::classify("received 1500 per diem", today()).unwrap();
    assert_eq!(tx.kind, Kind::Asset);
    assert_eq!(tx.category, Category::Income);
    assert_eq!(tx.amount, 1500.0);
}

#[test]
fn test_rules_asset_cue_wins_over_liability_verb() {
    // "paid" appears, but the salary cue marks this as income
    let tx = rules::classify("got paid my salary of 3000 today", today()).unwrap();
    assert_eq!(tx.kind, Kind::Asset);
    assert_eq!(tx.amount, 3000.0);
}

#[test]
fn test_rules_yesterday_shifts_date() {
    let tx = rules::classify("paid 120 for the doctor appointment yesterday", today()).unwrap();
    assert_eq!(tx.category, Category::Health);
    assert_eq!(tx.date, NaiveDate::from_ymd_opt(2026, 8, 28));
}

#[test]
fn test_rules_currency_symbols_and_commas() {
    let tx = rules::classify("spent $1,250.50 on furniture", today()).unwrap();
    assert_eq!(tx.amount, 1250.50);
    assert_eq!(tx.category, Category::Home);
}

#[test]
fn test_rules_question_is_not_a_record() {
    assert!(rules::classify("how much did I spend this month?", today()).is_none());
    assert!(rules::classify("hello there", today()).is_none());
}

#[test]
fn test_rules_statement_without_amount_is_skipped() {
    assert!(rules::classify("I spent way too much on food", today()).is_none());
}
