//! Tests for splitting bundles into sessions and seeding

#[cfg(test)]
mod tests {
    use crate::fixtures::{bundle, ids, refs, single_session_config};
    use cilia_curate::io::configuration::CurationConfig;
    use cilia_curate::session::builder::{Exclusion, SessionBuilder};
    use cilia_curate::session::discovery::Bundle;
    use std::path::Path;
    use tempfile::tempdir;

    fn bundles(dir: &Path, sizes: &[usize]) -> Vec<Bundle> {
        sizes
            .iter()
            .enumerate()
            .map(|(index, &size)| {
                let ids = ids(size);
                bundle(dir, index + 1, &format!("f{index}_CQ.txt"), &refs(&ids))
            })
            .collect()
    }

    // Tests a session closes once it reaches the ROI threshold
    // Verified by closing sessions before adding the bundle
    #[test]
    fn test_partition_threshold() {
        let dir = tempdir().unwrap();
        let bundles = bundles(dir.path(), &[3, 3, 3, 3]);
        let config = CurationConfig {
            roi_per_session: 5,
            ..CurationConfig::default()
        };

        let partition = SessionBuilder::with_seed(&config, 1).partition(&bundles);
        assert_eq!(partition.len(), 2);
        assert!(partition.iter().all(|session| session.len() == 2));

        let mut all: Vec<usize> = partition.concat();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    // Tests a zero threshold keeps every bundle in one session
    // Verified by closing a session after every bundle
    #[test]
    fn test_partition_single_session() {
        let dir = tempdir().unwrap();
        let bundles = bundles(dir.path(), &[2, 5, 1]);
        let partition = SessionBuilder::with_seed(&single_session_config(), 3).partition(&bundles);
        assert_eq!(partition.len(), 1);
        assert_eq!(partition[0].len(), 3);
    }

    // Tests bundles without reviewable rows are left out
    // Verified by counting commented rows as reviewable
    #[test]
    fn test_partition_skips_fully_culled() {
        let dir = tempdir().unwrap();
        let mut bundles = bundles(dir.path(), &[2]);
        let culled_path = dir.path().join("culled_CQ.txt");
        let text = crate::fixtures::cq_text(&["1"]).replace("\tsample.tif\t1", "# \tsample.tif\t1");
        std::fs::write(&culled_path, text).unwrap();
        let document = cilia_curate::ciliaq::document::CiliaQDocument::load(&culled_path).unwrap();
        bundles.push(Bundle::new(2, culled_path, None, document));

        let partition = SessionBuilder::with_seed(&single_session_config(), 0).partition(&bundles);
        assert_eq!(partition, vec![vec![0]]);

        let revisit = CurationConfig {
            revisit_culled: true,
            ..single_session_config()
        };
        let partition = SessionBuilder::with_seed(&revisit, 0).partition(&bundles);
        assert_eq!(partition[0].len(), 2);
    }

    // Tests equal seeds give equal sessions
    // Verified by reseeding from entropy inside partition
    #[test]
    fn test_seed_is_reproducible() {
        let dir = tempdir().unwrap();
        let bundles = bundles(dir.path(), &[4, 4, 4, 4, 4, 4]);
        let config = CurationConfig {
            roi_per_session: 8,
            ..CurationConfig::default()
        };

        let order = |seed| {
            SessionBuilder::from_seed(&config, Some(seed))
                .build(&bundles)
                .iter()
                .map(|session| session.handles().collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        assert_eq!(order(11), order(11));
        assert_ne!(order(11), order(12));
    }

    // Tests built sessions are numbered from 1 and cover every record
    // Verified by numbering sessions from 0
    #[test]
    fn test_build_numbers_sessions() {
        let dir = tempdir().unwrap();
        let bundles = bundles(dir.path(), &[5, 5, 5]);
        let config = CurationConfig {
            roi_per_session: 5,
            ..CurationConfig::default()
        };

        let sessions = SessionBuilder::new(&config).build(&bundles);
        let numbers: Vec<usize> = sessions.iter().map(|session| session.id()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(sessions.iter().all(|session| session.len() == 5));
    }

    // Tests excluded ids and name globs never reach a session
    // Verified by checking only the bundle id against the exclusion
    #[test]
    fn test_partition_honours_exclusion() {
        let dir = tempdir().unwrap();
        let bundles = bundles(dir.path(), &[2, 2, 2, 2]);
        let exclusion = Exclusion::parse(&["2".to_owned(), "f3_*.txt".to_owned()]).unwrap();
        assert!(exclusion.matches(&bundles[1]));
        assert!(exclusion.matches(&bundles[3]));
        assert!(!exclusion.matches(&bundles[0]));

        let partition = SessionBuilder::with_seed(&single_session_config(), 5)
            .excluding(exclusion)
            .partition(&bundles);
        let mut members = partition.concat();
        members.sort_unstable();
        assert_eq!(members, vec![0, 2]);
    }

    // Tests glob characters other than wildcards match literally
    // Verified by passing the glob to the regex unescaped
    #[test]
    fn test_exclusion_glob_is_literal() {
        let dir = tempdir().unwrap();
        let bundles = bundles(dir.path(), &[1, 1]);
        let dotted = Exclusion::parse(&["f?_CQ.txt".to_owned()]).unwrap();
        assert!(dotted.matches(&bundles[0]) && dotted.matches(&bundles[1]));

        let literal = Exclusion::parse(&["f0_CQ+txt".to_owned()]).unwrap();
        assert!(!literal.matches(&bundles[0]));
        assert!(Exclusion::parse(&[]).unwrap().is_empty());
        assert!(Exclusion::parse(&["0".to_owned()]).is_err());
        assert!(Exclusion::parse(&[" ".to_owned()]).is_err());
    }
}
