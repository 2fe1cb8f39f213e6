//! Validation of an ordered operation sequence and replay of the document it describes.

use crate::document::DidDocument;
use crate::error::Err;
use crate::operation::builder::{PRIMARY_FRAGMENT, RECOVERY_FRAGMENT};
use crate::operation::{unique_suffix, Operation, OperationHeader, OperationType, Payload};
use crate::suite::SuiteRegistry;
use crate::{tracerr, Result};

/// Validate an ordered operation sequence and return the document it resolves to.
///
/// The first operation must be a create, signed by a key in the document it creates. Each later
/// operation must state the same unique suffix, state the hash of the operation before it as
/// `previousOperationHash`, and be signed by the key its `kid` names in the current document.
/// Nothing may follow a recover or a delete. A deleted DID resolves to an empty document.
///
/// Creates and updates are signed with the `#primary` key, recovers and deletes with the
/// `#recovery` key. The DID in a `kid` must be `did:<method>:<suffix>` for this chain and the
/// same for every operation. Only a create may use a relative `kid`.
///
/// # Errors
///
/// * `Err::ChainIntegrity` - the sequence is empty, does not start with a create, a link or
///   suffix does not match, a `kid` names another DID, or an operation follows a terminal one.
/// * `Err::KeyNotFound` - the `kid` of an operation does not resolve to a key.
/// * `Err::InvalidSignature` - a signature does not verify or is made with the wrong key role.
/// * `Err::InvalidPatch` - an update does not apply to the current document.
pub fn validate_chain(operations: &[Operation], registry: &SuiteRegistry) -> Result<DidDocument> {
    let Some((create, rest)) = operations.split_first() else {
        tracerr!(Err::ChainIntegrity, "no operations to validate");
    };

    let Payload::Create(mut document) = create.payload()? else {
        tracerr!(Err::ChainIntegrity, "first operation is not a create");
    };
    let suffix = unique_suffix(create)?;
    let mut did = None;
    let header = create.header()?;
    check_kid(&header, &suffix, &mut did)?;
    check_signature(create, &header, &document, registry)?;

    let mut previous_hash = create.hash()?;
    let mut terminal: Option<OperationType> = None;

    for (index, op) in rest.iter().enumerate() {
        let header = op.header()?;
        if let Some(t) = terminal {
            tracerr!(Err::ChainIntegrity, "operation {} follows {t}", index + 1);
        }

        let payload = op.payload()?;
        if payload.did_unique_suffix() != Some(suffix.as_str()) {
            tracerr!(Err::ChainIntegrity, "operation {} is for another DID", index + 1);
        }
        if payload.previous_operation_hash() != Some(previous_hash.as_str()) {
            let n = index + 1;
            tracerr!(Err::ChainIntegrity, "operation {n} does not follow {previous_hash}");
        }
        check_kid(&header, &suffix, &mut did)?;
        check_signature(op, &header, &document, registry)?;

        match payload {
            Payload::Create(_) => {
                tracerr!(Err::ChainIntegrity, "operation {} is a second create", index + 1)
            }
            Payload::Update(update) => document.apply_patches(&update.patches)?,
            Payload::Recover(recover) => {
                document = recover.new_did_document;
                terminal = Some(OperationType::Recover);
            }
            Payload::Delete(_) => {
                document = DidDocument::default();
                terminal = Some(OperationType::Delete);
            }
        }
        previous_hash = op.hash()?;
    }

    tracing::debug!("validated {} operations for {suffix}", operations.len());
    Ok(document)
}

// Checks the key role and DID named by `kid`. The first DID seen is kept in `did`.
fn check_kid(header: &OperationHeader, suffix: &str, did: &mut Option<String>) -> Result<()> {
    let expected = match header.operation {
        OperationType::Create | OperationType::Update => PRIMARY_FRAGMENT,
        OperationType::Recover | OperationType::Delete => RECOVERY_FRAGMENT,
    };
    let (kid_did, fragment) = header.kid.split_at(header.kid.find('#').unwrap_or(header.kid.len()));
    if fragment != expected {
        let op = header.operation;
        tracerr!(Err::InvalidSignature, "{op} signed with {}, expected {expected}", header.kid);
    }

    if kid_did.is_empty() {
        if header.operation != OperationType::Create {
            let op = header.operation;
            tracerr!(Err::ChainIntegrity, "{op} must name the DID in {}", header.kid);
        }
        return Ok(());
    }

    let valid = kid_did.strip_prefix("did:").and_then(|rest| rest.split_once(':')).is_some_and(
        |(method, id)| !method.is_empty() && id == suffix,
    );
    if !valid {
        tracerr!(Err::ChainIntegrity, "{} does not name {suffix}", header.kid);
    }
    let Some(first) = did.as_deref() else {
        *did = Some(kid_did.to_string());
        return Ok(());
    };
    if first != kid_did {
        tracerr!(Err::ChainIntegrity, "{} does not name {first}", header.kid);
    }
    Ok(())
}

fn check_signature(
    op: &Operation, header: &OperationHeader, document: &DidDocument, registry: &SuiteRegistry,
) -> Result<()> {
    let Some(vm) = document.find_key(&header.kid) else {
        tracerr!(Err::KeyNotFound, "no key for {}", header.kid);
    };
    if !op.verify(&vm.public_key_bytes()?, registry) {
        tracerr!(Err::InvalidSignature, "signature does not verify under {}", header.kid);
    }
    Ok(())
}
