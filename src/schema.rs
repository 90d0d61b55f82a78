// Diesel table declarations for the broadcast pipeline store.
// Keep in sync with migrations/.

diesel::table! {
    use diesel::sql_types::*;

    broadcasts (id) {
        id -> Uuid,
        promo_id -> Uuid,
        #[max_length = 20]
        promo_class -> Varchar,
        owner_id -> Uuid,
        #[max_length = 40]
        owner_type -> Varchar,
        product_id -> Nullable<Uuid>,
        message -> Text,
        media_url -> Nullable<Text>,
        #[max_length = 20]
        environment -> Varchar,
        is_generic_promo -> Bool,
        #[max_length = 20]
        provider_from_override -> Nullable<Varchar>,
        recipients -> Jsonb,
        is_halted -> Bool,
        halted_msg -> Nullable<Text>,
        worker_jobs -> Array<Nullable<Text>>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    job_directives (id) {
        id -> Uuid,
        broadcast_id -> Uuid,
        message -> Text,
        media_url -> Nullable<Text>,
        #[max_length = 20]
        environment -> Varchar,
        is_generic_promo -> Bool,
        #[max_length = 20]
        provider_from_override -> Nullable<Varchar>,
        recipients -> Jsonb,
        enqueued_at -> Timestamptz,
        #[max_length = 32]
        job_id -> Varchar,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    short_links (id) {
        id -> Uuid,
        base_url -> Text,
        #[max_length = 20]
        short_code -> Varchar,
        short_link -> Text,
        #[max_length = 20]
        environment -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    sms_messages (id) {
        id -> Uuid,
        broadcast_id -> Uuid,
        sent_at -> Timestamptz,
        provider_status -> Int4,
        #[max_length = 100]
        provider_status_msg -> Varchar,
        provider_response -> Text,
        #[max_length = 20]
        from_phone -> Varchar,
        #[max_length = 20]
        to_phone -> Varchar,
        body -> Text,
        media_url -> Nullable<Text>,
        short_link -> Text,
        #[max_length = 20]
        short_code -> Varchar,
        #[max_length = 20]
        short_code_upper -> Varchar,
        #[max_length = 32]
        job_id -> Varchar,
        is_generic_promo -> Bool,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    job_log_lines (id) {
        id -> Uuid,
        broadcast_id -> Uuid,
        #[max_length = 32]
        job_id -> Varchar,
        #[max_length = 64]
        sequence_key -> Varchar,
        log_line -> Text,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    stop_list (phone) {
        #[max_length = 20]
        phone -> Varchar,
        stop_messages -> Bool,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    promotions (id) {
        id -> Uuid,
        snapshot -> Jsonb,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    promotions_general (id) {
        id -> Uuid,
        snapshot -> Jsonb,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    products (id) {
        id -> Uuid,
        snapshot -> Jsonb,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    promo_customer_texts (id) {
        id -> Uuid,
        sms_id -> Uuid,
        broadcast_id -> Uuid,
        customer_id -> Nullable<Uuid>,
        #[max_length = 20]
        phone -> Varchar,
        short_link -> Text,
        #[max_length = 20]
        short_code -> Varchar,
        text_sent -> Bool,
        #[max_length = 20]
        environment -> Varchar,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    snapshot_events (id) {
        id -> Uuid,
        occurred_at -> Timestamptz,
        #[max_length = 40]
        timestamp -> Varchar,
        #[max_length = 20]
        environment -> Varchar,
        #[max_length = 64]
        user_doc_id -> Varchar,
        #[max_length = 100]
        user_name -> Varchar,
        #[max_length = 40]
        user_type -> Varchar,
        #[max_length = 60]
        event -> Varchar,
        data -> Jsonb,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    qr_images (filename) {
        #[max_length = 64]
        filename -> Varchar,
        content -> Binary,
        metadata -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    broadcasts,
    job_directives,
    short_links,
    sms_messages,
    job_log_lines,
    stop_list,
    promotions,
    promotions_general,
    products,
    promo_customer_texts,
    snapshot_events,
    qr_images,
);
