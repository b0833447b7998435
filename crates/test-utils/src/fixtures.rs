//! Common test fixtures for KMA forecast tests.

/// Reference coordinates with the grid cell the provider assigns to them.
pub mod points {
    /// A named coordinate and its expected KMA grid cell.
    #[derive(Debug, Clone, Copy)]
    pub struct ReferencePoint {
        pub name: &'static str,
        pub lat: f64,
        pub lon: f64,
        pub x: i32,
        pub y: i32,
    }

    /// Projection origin (38N, 126E)
    pub const ORIGIN: ReferencePoint = ReferencePoint {
        name: "origin",
        lat: 38.0,
        lon: 126.0,
        x: 43,
        y: 136,
    };

    /// Seoul City Hall
    pub const SEOUL: ReferencePoint = ReferencePoint {
        name: "seoul",
        lat: 37.5665,
        lon: 126.9780,
        x: 60,
        y: 127,
    };

    /// Daejeon City Hall
    pub const DAEJEON: ReferencePoint = ReferencePoint {
        name: "daejeon",
        lat: 36.3504,
        lon: 127.3845,
        x: 67,
        y: 100,
    };

    /// Yuseong-gu Guseong-dong, Daejeon
    pub const GUSEONG: ReferencePoint = ReferencePoint {
        name: "guseong",
        lat: 36.3725,
        lon: 127.3605,
        x: 67,
        y: 101,
    };

    /// Busan City Hall
    pub const BUSAN: ReferencePoint = ReferencePoint {
        name: "busan",
        lat: 35.1796,
        lon: 129.0756,
        x: 98,
        y: 76,
    };

    /// Jeju City
    pub const JEJU: ReferencePoint = ReferencePoint {
        name: "jeju",
        lat: 33.4996,
        lon: 126.5312,
        x: 53,
        y: 38,
    };

    pub const ALL: [ReferencePoint; 6] = [ORIGIN, SEOUL, DAEJEON, GUSEONG, BUSAN, JEJU];
}

/// Location lookup tables in the shipped JSON shape.
pub mod locations {
    pub const SAMPLE_TABLE: &str = r#"{
    "서울특별시 강남구 역삼1동": {"x": 61, "y": 125},
    "대전광역시 유성구 구성동": {"x": 67, "y": 101},
    "부산광역시 해운대구 우제1동": {"x": 99, "y": 75},
    "A": {"x": 67, "y": 101}
}"#;
}

/// Common time values for testing, in provider `%Y%m%d%H%M` format.
pub mod time {
    pub const BASE_0200: &str = "202501010200";
    pub const NOW_0300: &str = "202501010300";
    pub const EFFECTIVE_FROM_0400: [&str; 3] = ["202501010400", "202501010500", "202501010600"];
}
