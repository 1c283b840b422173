// Diesel table definitions mirroring migrations/.

diesel::table! {
    system_metrics (id) {
        id -> BigInt,
        name -> Text,
        #[sql_name = "type"]
        kind -> Text,
        value -> Double,
        timestamp -> Text,
        tags -> Text,
        description -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    endpoints (id) {
        id -> BigInt,
        url -> Text,
        is_active -> Bool,
        created_at -> Text,
        deleted_at -> Nullable<Text>,
    }
}

diesel::table! {
    monitoring_results (id) {
        id -> BigInt,
        endpoint_id -> BigInt,
        status_code -> Integer,
        response_time_ms -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    alerts (id) {
        id -> BigInt,
        endpoint_id -> BigInt,
        triggered_at -> Nullable<Text>,
        deleted_at -> Nullable<Text>,
    }
}

diesel::joinable!(monitoring_results -> endpoints (endpoint_id));
diesel::joinable!(alerts -> endpoints (endpoint_id));

diesel::allow_tables_to_appear_in_same_query!(system_metrics, endpoints, monitoring_results, alerts);
