//! Integration tests for the lock seal.

mod common;

use common::*;
use pdf_countersign::document::{DocumentView, RevisionChain};
use pdf_countersign::signatures::{AnnotationFlags, Pkcs7Binder};
use pdf_countersign::{
    DocumentLocker, EngineConfig, Error, LockStatus, PlacementRequest, SignatureEngine,
    SignatureVerifier, SigningOptions,
};

fn locked_options() -> SigningOptions {
    SigningOptions::new().with_lock(true)
}

mod seal_tests {
    use super::*;

    #[test]
    fn test_lock_after_signing() {
        let pdf = sample_pdf(2);
        let engine = SignatureEngine::new(EngineConfig::default());
        let requests = vec![
            PlacementRequest::signature(0, 0.1, 0.1),
            PlacementRequest::initials(1, 0.9, 0.0),
        ];

        let signed = engine
            .sign(&pdf, &rsa_p12(), PASSWORD, &requests, &locked_options())
            .unwrap();
        assert_eq!(signed.lock, LockStatus::Locked);

        let verifier = SignatureVerifier::new();
        let results = verifier.verify_document(&signed.bytes).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status.is_valid()));

        let seal = results.last().unwrap();
        assert_eq!(seal.field_name, "Lock_Seal");
        assert!(seal.covers_whole_document);
        assert!(seal.signature_info.forbids_changes);
        assert!(!results[0].signature_info.forbids_changes);
        assert!(verifier.is_locked(&signed.bytes).unwrap());
        assert!(!verifier.is_locked(&pdf).unwrap());
    }

    #[test]
    fn test_seal_widget_is_hidden() {
        let engine = SignatureEngine::new(EngineConfig::default());
        let signed = engine
            .sign(
                &sample_pdf(1),
                &rsa_p12(),
                PASSWORD,
                &[PlacementRequest::signature(0, 0.5, 0.5)],
                &locked_options(),
            )
            .unwrap();

        let view = DocumentView::parse(&signed.bytes).unwrap();
        let seal = view
            .fields()
            .into_iter()
            .find(|f| f.name == "Lock_Seal")
            .unwrap();
        let field = view.dict(seal.id).unwrap();

        assert_eq!(
            field.get(b"F").unwrap().as_i64().unwrap(),
            AnnotationFlags::SEAL.bits() as i64
        );
        assert!(!field.has(b"AP"));
        let rect: Vec<f32> = field
            .get(b"Rect")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        assert_eq!(rect, vec![0.0, 0.0, 0.0, 0.0]);

        let lock = field.get(b"Lock").unwrap().as_dict().unwrap();
        assert_eq!(lock.get(b"Type").unwrap().as_name().unwrap(), b"SigFieldLock");
        assert_eq!(lock.get(b"Action").unwrap().as_name().unwrap(), b"All");
        assert_eq!(lock.get(b"P").unwrap().as_i64().unwrap(), 1);
        assert!(view.is_locked());
    }

    #[test]
    fn test_locked_document_cannot_be_signed() {
        let engine = SignatureEngine::new(EngineConfig::default());
        let p12 = rsa_p12();
        let request = [PlacementRequest::signature(0, 0.5, 0.5)];
        let signed = engine
            .sign(&sample_pdf(1), &p12, PASSWORD, &request, &locked_options())
            .unwrap();

        let again = engine.sign(&signed.bytes, &p12, PASSWORD, &request, &SigningOptions::default());
        assert!(matches!(again, Err(Error::DocumentLocked)));
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_lock_failure_keeps_signatures() {
        let pdf = sample_pdf(1);
        let session = open_session(&rsa_p12());
        let engine = SignatureEngine::new(EngineConfig::default());
        let requests = vec![
            PlacementRequest::signature(0, 0.1, 0.1),
            PlacementRequest::signature(0, 0.6, 0.1),
        ];
        // calls 1 and 2 bind the marks, call 3 is the seal
        let binder = FailingBinder::new(&session, 3);

        let signed = engine
            .sign_with_binder(&pdf, &session, &requests, &locked_options(), &binder, signing_time())
            .unwrap();

        assert!(matches!(signed.lock, LockStatus::Failed(ref msg) if msg.contains("injected")));
        let verifier = SignatureVerifier::new();
        let results = verifier.verify_document(&signed.bytes).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status.is_valid()));
        assert!(results[1].covers_whole_document);
        assert!(!verifier.is_locked(&signed.bytes).unwrap());
    }

    #[test]
    fn test_locking_twice_fails() {
        let session = open_session(&rsa_p12());
        let binder = Pkcs7Binder::new(session.certificate());
        let locker = DocumentLocker::new(&EngineConfig::default());
        let mut chain = RevisionChain::new(&sample_pdf(1));

        let report = locker.lock_at(&mut chain, &session, &binder, signing_time()).unwrap();
        assert_eq!(report.field_name, "Lock_Seal");
        assert_eq!(report.byte_range[0], 0);
        let sealed_len = chain.len();

        let second = locker.lock_at(&mut chain, &session, &binder, signing_time());
        assert!(matches!(second, Err(Error::LockFailure(_))));
        assert_eq!(chain.len(), sealed_len);
    }

    #[test]
    fn test_lock_errors_are_lock_failures() {
        let session = open_session(&rsa_p12());
        let binder = FailingBinder::new(&session, 1);
        let locker = DocumentLocker::new(&EngineConfig::default());
        let original = sample_pdf(1);
        let mut chain = RevisionChain::new(&original);

        let result = locker.lock(&mut chain, &session, &binder);
        assert!(matches!(result, Err(Error::LockFailure(_))));
        assert_eq!(chain.serialize(), original);
    }
}
