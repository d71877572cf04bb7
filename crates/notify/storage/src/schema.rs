//! Diesel schema definitions.

diesel::table! {
    devices (token) {
        token -> Text,
        created_at -> Timestamp,
        last_registered_at -> Timestamp,
    }
}

diesel::table! {
    reminders (id) {
        id -> Text,
        token -> Text,
        title -> Text,
        body -> Text,
        scheduled_at -> Timestamp,
        created_at -> Timestamp,
    }
}

diesel::table! {
    push_logs (id) {
        id -> Integer,
        filename -> Text,
        status -> Text,
        error -> Text,
        timestamp -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(devices, reminders, push_logs);
