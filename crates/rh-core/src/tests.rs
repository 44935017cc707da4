//! Unit tests for rh-core primitives.

#[cfg(test)]
mod ids {
    use crate::{DisruptionId, EdgeId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(NodeId(0) < NodeId(1));
        assert!(EdgeId(100) > EdgeId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::INVALID.0, u32::MAX);
        assert_eq!(DisruptionId::INVALID.0, u64::MAX);
        assert!(!EdgeId::default().is_valid());
        assert!(EdgeId(3).is_valid());
    }

    #[test]
    fn display() {
        assert_eq!(NodeId(7).to_string(), "NodeId(7)");
    }
}

#[cfg(test)]
mod geo {
    use crate::GeoPoint;

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(14.676, 121.043);
        assert!(p.distance_m(p) < 0.01);
    }

    #[test]
    fn one_degree_latitude() {
        // ~1 degree of latitude ≈ 111 km
        let a = GeoPoint::new(14.0, 121.0);
        let b = GeoPoint::new(15.0, 121.0);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn midpoint_lies_between() {
        let m = GeoPoint::new(14.60, 121.00).midpoint(GeoPoint::new(14.62, 121.04));
        assert!((m.lat - 14.61).abs() < 1e-9);
        assert!((m.lng - 121.02).abs() < 1e-9);
    }

    #[test]
    fn checked_rejects_out_of_range() {
        assert!(GeoPoint::checked(14.6, 121.0).is_ok());
        assert!(GeoPoint::checked(91.0, 0.0).is_err());
        assert!(GeoPoint::checked(0.0, -181.0).is_err());
        assert!(GeoPoint::checked(f64::NAN, 0.0).is_err());
    }
}

#[cfg(test)]
mod time {
    use crate::Timestamp;

    #[test]
    fn arithmetic() {
        let t = Timestamp(1_000);
        assert_eq!(t.plus_secs(60), Timestamp(1_060));
        assert_eq!(Timestamp(i64::MAX).plus_secs(1), Timestamp(i64::MAX), "saturates");
    }

    #[test]
    fn now_is_after_epoch() {
        assert!(Timestamp::now() > Timestamp::EPOCH);
    }
}

#[cfg(test)]
mod rng {
    use crate::ScenarioRng;

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = ScenarioRng::new(12345);
        let mut r2 = ScenarioRng::new(12345);
        for _ in 0..100 {
            let a: f64 = r1.random();
            let b: f64 = r2.random();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn choose_stays_in_slice() {
        let mut rng = ScenarioRng::new(7);
        let roads = ["Aurora Blvd", "EDSA", "Katipunan Ave"];
        for _ in 0..20 {
            assert!(roads.contains(rng.choose(&roads).unwrap()));
        }
        assert!(rng.choose::<u8>(&[]).is_none());
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = ScenarioRng::new(0);
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = ScenarioRng::new(0);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        assert_eq!(rng.choose(&[9]), Some(&9));
    }
}
