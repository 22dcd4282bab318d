pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id VARCHAR(20) PRIMARY KEY,
    lat DOUBLE PRECISION NOT NULL DEFAULT 27.7172,
    lng DOUBLE PRECISION NOT NULL DEFAULT 85.3240,
    speed DOUBLE PRECISION NOT NULL DEFAULT 0,
    heading DOUBLE PRECISION NOT NULL DEFAULT 0,
    last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS accidents (
    id BIGSERIAL PRIMARY KEY,
    vehicle VARCHAR(20) NOT NULL,
    lat DOUBLE PRECISION NOT NULL,
    lng DOUBLE PRECISION NOT NULL,
    road_name VARCHAR(100) NOT NULL DEFAULT 'Unknown Road',
    severity VARCHAR(20) NOT NULL DEFAULT 'Minor',
    description TEXT NOT NULL DEFAULT 'Vehicle accident reported',
    injuries INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    status VARCHAR(20) NOT NULL DEFAULT 'Pending',
    dispatched_units TEXT[] NOT NULL DEFAULT '{}',
    resolved_at TIMESTAMPTZ NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS violations (
    id BIGSERIAL PRIMARY KEY,
    vehicle VARCHAR(20) NOT NULL,
    lat DOUBLE PRECISION NOT NULL,
    lng DOUBLE PRECISION NOT NULL,
    speed DOUBLE PRECISION NOT NULL,
    lane VARCHAR(10) NOT NULL,
    violation_type VARCHAR(50) NOT NULL,
    video_clip VARCHAR(100) NOT NULL,
    fine_amount INTEGER NOT NULL DEFAULT 500,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS traffic_signals (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE,
    lat DOUBLE PRECISION NOT NULL,
    lng DOUBLE PRECISION NOT NULL,
    state VARCHAR(10) NOT NULL DEFAULT 'Green',
    cycle_time INTEGER NOT NULL DEFAULT 60
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS operators (
    operator_id VARCHAR(50) PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    password_hash VARCHAR(200) NOT NULL,
    role VARCHAR(50) NOT NULL DEFAULT 'Operator',
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    last_login TIMESTAMPTZ NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
];

pub const SELECT_STATS: &str = r#"
SELECT
    (SELECT COUNT(*) FROM vehicles) AS total_vehicles,
    (SELECT COALESCE(SUM(speed), 0) FROM vehicles) AS speed_sum,
    (SELECT COUNT(*) FROM vehicles WHERE speed > $1) AS overspeeding,
    (SELECT COUNT(*) FROM accidents WHERE status = 'Pending') AS active_accidents,
    (SELECT COUNT(*) FROM accidents) AS total_accidents,
    (SELECT COUNT(*) FROM accidents
        WHERE severity IN ('Severe', 'Fatal') AND status = 'Pending') AS severe_accidents,
    (SELECT COUNT(*) FROM violations) AS total_violations;
"#;

pub const SELECT_VEHICLES: &str = r#"
SELECT vehicle_id, lat, lng, speed, heading, last_updated FROM vehicles ORDER BY vehicle_id;
"#;

pub const SELECT_SLOW_VEHICLES: &str = r#"
SELECT vehicle_id, lat, lng, speed, heading, last_updated FROM vehicles
WHERE speed < $1 ORDER BY vehicle_id;
"#;

pub const SELECT_VEHICLE_FOR_UPDATE: &str = r#"
SELECT vehicle_id, lat, lng, speed, heading, last_updated FROM vehicles
WHERE vehicle_id = $1 FOR UPDATE;
"#;

pub const UPSERT_VEHICLE: &str = r#"
INSERT INTO vehicles (vehicle_id, lat, lng, speed, heading, last_updated)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (vehicle_id) DO UPDATE
SET lat = $2,
    lng = $3,
    speed = $4,
    heading = $5,
    last_updated = $6;
"#;

pub const SELECT_ACCIDENTS: &str = r#"
SELECT id, vehicle, lat, lng, road_name, severity, description, injuries, created_at, status, dispatched_units, resolved_at
FROM accidents ORDER BY created_at DESC, id DESC;
"#;

pub const SELECT_ACCIDENT_FOR_UPDATE: &str = r#"
SELECT id, vehicle, lat, lng, road_name, severity, description, injuries, created_at, status, dispatched_units, resolved_at
FROM accidents WHERE id = $1 FOR UPDATE;
"#;

pub const INSERT_ACCIDENT: &str = r#"
INSERT INTO accidents (vehicle, lat, lng, road_name, severity, description, injuries, created_at, status)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Pending')
RETURNING id, vehicle, lat, lng, road_name, severity, description, injuries, created_at, status, dispatched_units, resolved_at;
"#;

pub const COUNT_PENDING_ACCIDENTS: &str = r#"
SELECT COUNT(*) FROM accidents WHERE status = 'Pending';
"#;

pub const UPDATE_ACCIDENT_STATUS: &str = r#"
UPDATE accidents
SET status = $2,
    dispatched_units = $3,
    resolved_at = $4
WHERE id = $1;
"#;

pub const SELECT_VIOLATIONS: &str = r#"
SELECT id, vehicle, lat, lng, speed, lane, violation_type, video_clip, fine_amount, created_at
FROM violations ORDER BY created_at DESC, id DESC;
"#;

pub const INSERT_VIOLATION: &str = r#"
INSERT INTO violations (vehicle, lat, lng, speed, lane, violation_type, video_clip, fine_amount, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING id, vehicle, lat, lng, speed, lane, violation_type, video_clip, fine_amount, created_at;
"#;

pub const COUNT_VIOLATIONS: &str = r#"
SELECT COUNT(*) FROM violations;
"#;

pub const SELECT_SIGNALS: &str = r#"
SELECT id, name, lat, lng, state, cycle_time FROM traffic_signals ORDER BY id;
"#;

// Existing signals keep their position and state.
pub const UPSERT_SIGNAL: &str = r#"
INSERT INTO traffic_signals (name, lat, lng, state, cycle_time)
VALUES ($1, $2, $3, 'Green', $4)
ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
RETURNING id, name, lat, lng, state, cycle_time;
"#;

pub const UPDATE_SIGNAL_STATE: &str = r#"
UPDATE traffic_signals SET state = $2 WHERE id = $1;
"#;

pub const INSERT_OPERATOR: &str = r#"
INSERT INTO operators (operator_id, name, password_hash, role, is_active, created_at)
VALUES ($1, $2, $3, $4, TRUE, $5)
RETURNING operator_id, name, password_hash, role, is_active, last_login, created_at;
"#;

pub const SELECT_OPERATOR: &str = r#"
SELECT operator_id, name, password_hash, role, is_active, last_login, created_at
FROM operators WHERE operator_id = $1;
"#;

pub const UPDATE_OPERATOR_LAST_LOGIN: &str = r#"
UPDATE operators SET last_login = $2 WHERE operator_id = $1;
"#;
