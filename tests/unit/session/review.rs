//! Tests for session contents, shuffling and decisions

#[cfg(test)]
mod tests {
    use crate::fixtures::{bundle, cq_text, ids, refs};
    use cilia_curate::ciliaq::document::CiliaQDocument;
    use cilia_curate::ciliaq::record::Decision;
    use cilia_curate::session::discovery::Bundle;
    use cilia_curate::session::review::{RecordHandle, ReviewSession};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn culled_bundle(dir: &Path) -> Bundle {
        let path = dir.join("c_CQ.txt");
        let text = cq_text(&["1", "2"]).replace("\tsample.tif\t2", "# \tsample.tif\t2");
        fs::write(&path, text).unwrap();
        let document = CiliaQDocument::load(&path).unwrap();
        Bundle::new(2, path, None, document)
    }

    // Tests every reviewable record appears exactly once
    // Verified by sampling records with replacement
    #[test]
    fn test_session_covers_records() {
        let dir = tempdir().unwrap();
        let bundles = vec![
            bundle(dir.path(), 1, "a_CQ.txt", &["1", "2", "3"]),
            culled_bundle(dir.path()),
        ];
        let mut rng = StdRng::seed_from_u64(9);
        let session = ReviewSession::new(4, vec![0, 1], &bundles, false, &mut rng);

        assert_eq!(session.id(), 4);
        assert_eq!(session.bundle_indices(), [0, 1]);
        assert_eq!(session.len(), 4);
        let unique: HashSet<RecordHandle> = session.handles().collect();
        assert_eq!(unique.len(), 4);
        assert!(!unique.contains(&RecordHandle { bundle: 1, record: 1 }));
    }

    // Tests culled records are included and shown as marked when revisiting
    // Verified by treating every loaded record as active
    #[test]
    fn test_revisit_culled_records() {
        let dir = tempdir().unwrap();
        let bundles = vec![culled_bundle(dir.path())];
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = ReviewSession::new(1, vec![0], &bundles, true, &mut rng);
        assert_eq!(session.len(), 2);
        assert_eq!(session.marked_count(), 1);

        let culled = session
            .handles()
            .position(|handle| handle.record == 1)
            .unwrap();
        assert!(session.is_marked(culled));
        assert_eq!(session.toggle(culled), Some(Decision::Keep));
        assert!(!session.is_marked(culled));
        assert_eq!(session.decisions_for(0, 2)[1], Decision::Keep);
    }

    // Tests toggling twice clears the mark and decisions can be reset
    // Verified by leaving decisions in place after clearing
    #[test]
    fn test_toggle_and_clear() {
        let dir = tempdir().unwrap();
        let bundles = vec![bundle(dir.path(), 1, "a_CQ.txt", &["1", "2"])];
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = ReviewSession::new(1, vec![0], &bundles, false, &mut rng);

        assert_eq!(session.toggle(0), Some(Decision::Reject));
        assert!(session.is_marked(0));
        assert_eq!(session.toggle(0), Some(Decision::Keep));
        assert!(!session.is_marked(0));
        assert_eq!(session.toggle(5), None);

        session.toggle(1);
        assert_eq!(session.marked_count(), 1);
        session.clear_decisions();
        assert_eq!(session.marked_count(), 0);
        assert_eq!(session.decision(1), Some(Decision::Unset));
        assert_eq!(session.decision(2), None);
    }

    // Tests decisions land on the file position of each record
    // Verified by writing decisions in display order
    #[test]
    fn test_decisions_in_file_order() {
        let dir = tempdir().unwrap();
        let bundles = vec![bundle(dir.path(), 1, "a_CQ.txt", &["1", "2", "3"])];
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = ReviewSession::new(1, vec![0], &bundles, false, &mut rng);

        let third = session
            .handles()
            .position(|handle| handle.record == 2)
            .unwrap();
        session.toggle(third);
        assert_eq!(
            session.decisions_for(0, 3),
            vec![Decision::Unset, Decision::Unset, Decision::Reject]
        );
        assert_eq!(session.decisions_for(7, 1), vec![Decision::Unset]);
    }

    // Tests display order is a permutation that changes with the seed
    // Verified by keeping records in file order
    #[test]
    fn test_order_is_shuffled() {
        let dir = tempdir().unwrap();
        let ids = ids(30);
        let bundles = vec![bundle(dir.path(), 1, "a_CQ.txt", &refs(&ids))];

        let order = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            ReviewSession::new(1, vec![0], &bundles, false, &mut rng)
                .handles()
                .map(|handle| handle.record)
                .collect::<Vec<_>>()
        };
        let first = order(1);
        assert_ne!(first, (0..30).collect::<Vec<_>>());
        assert_ne!(first, order(2));
        assert_eq!(first, order(1));
    }
}
