//! Tests for building, validating and ordering operation chains.

use hypns_did::document::VerificationMethod;
use hypns_did::error::Err;
use hypns_did::keys::mnemonic::{MnemonicKeySystem, Purpose};
use hypns_did::keys::KeyPair;
use hypns_did::operation::{
    decode_batch, order, unique_suffix, validate_chain, BatchFile, Payload, TransactionRecord,
};
use hypns_did::wallet::mapper::to_did_document;
use hypns_did::wallet::{KeyEntry, KeyRecord, Wallet};
use hypns_did::{codec, DidDocument, OperationBuilder, SuiteRegistry};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon \
                        abandon abandon about";

struct Keys {
    primary: KeyPair,
    recovery: KeyPair,
    attestation: KeyPair,
}

fn keys() -> Keys {
    let mks = MnemonicKeySystem::new(MNEMONIC).expect("should create key system");
    Keys {
        primary: mks.key_for_purpose(Purpose::Primary, 0).expect("should derive key"),
        recovery: mks.key_for_purpose(Purpose::Recovery, 0).expect("should derive key"),
        attestation: mks.key_for_purpose(Purpose::Attestation, 0).expect("should derive key"),
    }
}

fn document(keys: &Keys) -> DidDocument {
    let mut wallet = Wallet::new();
    wallet
        .add(KeyRecord::Signing(KeyEntry::new(&keys.primary).fragment("#primary")))
        .expect("should add");
    wallet
        .add(KeyRecord::Signing(KeyEntry::new(&keys.recovery).fragment("#recovery")))
        .expect("should add");
    to_did_document(&wallet)
}

// create -> update -> update, signed with ES256K keys derived from a mnemonic.
#[test]
fn chain_links_and_validates() {
    let registry = SuiteRegistry::with_defaults();
    let builder = OperationBuilder::new("hypns", &registry);
    let keys = keys();

    let doc0 = document(&keys);
    let create = builder.create(&doc0, &keys.primary).expect("should create");
    let suffix = unique_suffix(&create).expect("should extract suffix");
    assert_eq!(suffix, codec::hash(&doc0).expect("should hash"));

    let mut doc1 = doc0.clone();
    doc1.service.push(hypns_did::Service {
        id: "#merkle-root".to_string(),
        type_: "LinkedDomains".to_string(),
        service_endpoint: "hypns://3f2a1c".to_string(),
    });
    let update1 = builder.update(&create, &doc0, &doc1, &keys.primary).expect("should update");

    let attestation = VerificationMethod {
        id: "#attestation".to_string(),
        type_: "EcdsaSecp256k1VerificationKey2019".to_string(),
        usage: Some("signing".to_string()),
        public_key_hex: Some(keys.attestation.public_key_hex()),
        ..VerificationMethod::default()
    };
    let update2 = builder.add_key(&update1, attestation, &keys.primary).expect("should update");

    let chain = [create, update1, update2];
    for pair in chain.windows(2) {
        let payload = pair[1].payload().expect("should decode payload");
        assert_eq!(payload.previous_operation_hash(), Some(pair[0].hash().expect("hash").as_str()));
        assert_eq!(payload.did_unique_suffix(), Some(suffix.as_str()));
        assert_eq!(pair[1].header().expect("header").kid, format!("did:hypns:{suffix}#primary"));
    }

    let resolved = validate_chain(&chain, &registry).expect("should validate");
    assert_eq!(resolved.service, doc1.service);
    assert!(resolved.find_key("#attestation").is_some());
    assert_eq!(resolved.public_key.len(), 3);
}

// Changing a payload without re-linking the chain is rejected.
#[test]
fn tampered_chain_rejected() {
    let registry = SuiteRegistry::with_defaults();
    let builder = OperationBuilder::new("hypns", &registry);
    let keys = keys();

    let doc0 = document(&keys);
    let create = builder.create(&doc0, &keys.primary).expect("should create");
    let update1 = builder.remove_key(&create, "#recovery", &keys.primary).expect("should update");
    let update2 = builder.remove_key(&update1, "#primary", &keys.primary).expect("should update");

    // re-signed by the owner but no longer the payload the next operation links to
    let mut changed = doc0.clone();
    changed.context.push("https://example.com/extra".to_string());
    let forged = builder.update(&create, &doc0, &changed, &keys.primary).expect("should build");
    let err = validate_chain(&[create.clone(), forged, update2.clone()], &registry)
        .expect_err("should reject");
    assert!(err.is(Err::ChainIntegrity));

    // payload swapped under the original signature
    let mut swapped = update1.clone();
    swapped.payload = update2.payload.clone();
    let err = validate_chain(&[create.clone(), swapped, update2.clone()], &registry)
        .expect_err("should reject");
    assert!(err.is(Err::ChainIntegrity) || err.is(Err::InvalidSignature));

    validate_chain(&[create, update1, update2], &registry).expect("original should validate");
}

#[test]
fn sign_verify_with_derived_keys() {
    let registry = SuiteRegistry::with_defaults();
    let builder = OperationBuilder::new("hypns", &registry);
    let keys = keys();

    let create = builder.create(&document(&keys), &keys.primary).expect("should create");
    assert!(create.verify(&keys.primary.public_key, &registry));
    assert!(!create.verify(&keys.recovery.public_key, &registry));

    let empty = SuiteRegistry::new();
    assert!(!create.verify(&keys.primary.public_key, &empty));
}

#[test]
fn orders_by_transaction_number() {
    let registry = SuiteRegistry::with_defaults();
    let builder = OperationBuilder::new("hypns", &registry);
    let keys = keys();

    let create = builder.create(&document(&keys), &keys.primary).expect("should create");
    let update1 = builder.remove_key(&create, "#a", &keys.primary).expect("should update");
    let update2 = builder.remove_key(&update1, "#b", &keys.primary).expect("should update");

    let records = vec![
        TransactionRecord {
            transaction_number: 814,
            operation: update2.clone(),
        },
        TransactionRecord {
            transaction_number: 812,
            operation: create.clone(),
        },
        TransactionRecord {
            transaction_number: 813,
            operation: update1.clone(),
        },
    ];

    let ordered = order(&records);
    let numbers: Vec<u64> = ordered.iter().map(|r| r.transaction_number).collect();
    assert_eq!(numbers, vec![812, 813, 814]);

    let operations: Vec<_> = ordered.into_iter().map(|r| r.operation).collect();
    assert_eq!(operations, vec![create, update1, update2]);
    validate_chain(&operations, &registry).expect("ordered chain should validate");

    let json = serde_json::to_value(&records[0]).expect("should serialize");
    assert_eq!(json["transactionNumber"], 814);
}

#[test]
fn batch_round_trip() {
    let registry = SuiteRegistry::with_defaults();
    let builder = OperationBuilder::new("hypns", &registry);
    let keys = keys();

    let create = builder.create(&document(&keys), &keys.primary).expect("should create");
    let recover =
        builder.recover(&create, &document(&keys), &keys.recovery).expect("should recover");
    let batch = BatchFile {
        operations: vec![
            create.encode().expect("should encode"),
            recover.encode().expect("should encode"),
        ],
    };

    let decoded = decode_batch(&batch).expect("should decode");
    assert_eq!(decoded[0].operation_hash, create.hash().expect("should hash"));
    assert_eq!(decoded[1].header.kid, format!("did:hypns:{}#recovery", decoded[0].operation_hash));
    let Payload::Recover(payload) = &decoded[1].payload else {
        panic!("expected recover payload");
    };
    assert_eq!(payload.previous_operation_hash, decoded[0].operation_hash);
}
