//! Diesel table definitions for the farm schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts. `user_password` holds an Argon2 PHC string.
    users (user_id) {
        user_id -> Int4,
        username -> Varchar,
        user_tel -> Varchar,
        user_password -> Text,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Land parcels owned by a user.
    field (field_id) {
        field_id -> Int4,
        user_id -> Int4,
        field_name -> Varchar,
        size_square_meter -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ordered boundary vertices of a field.
    field_point (point_id) {
        point_id -> Int4,
        field_id -> Int4,
        latitude -> Float8,
        longitude -> Float8,
        point_order -> Int4,
    }
}

diesel::table! {
    zone (zone_id) {
        zone_id -> Int4,
        field_id -> Int4,
        zone_name -> Varchar,
        num_trees -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tree locations; `tree_no` is unique per zone.
    mark_zone (mark_id) {
        mark_id -> Int4,
        zone_id -> Int4,
        tree_no -> Int4,
        latitude -> Float8,
        longitude -> Float8,
    }
}

diesel::table! {
    fertilizer (fertilizer_id) {
        fertilizer_id -> Int4,
        fert_name -> Varchar,
        formulation -> Nullable<Varchar>,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    nutrient_deficiency (nutrient_code) {
        nutrient_code -> Varchar,
        nutrient_name -> Varchar,
        common_symptoms -> Nullable<Text>,
        diagnostic_notes -> Nullable<Text>,
        image_path -> Nullable<Text>,
        fertilizer_id -> Nullable<Int4>,
    }
}

diesel::table! {
    /// Inspection rounds, numbered per zone.
    zone_inspection (inspection_id) {
        inspection_id -> Int4,
        field_id -> Int4,
        zone_id -> Int4,
        round_no -> Int4,
        status -> Varchar,
        notes -> Nullable<Text>,
        inspected_at -> Timestamptz,
    }
}

diesel::table! {
    zone_inspection_image (image_id) {
        image_id -> Int4,
        inspection_id -> Int4,
        image_path -> Text,
        detection_path -> Nullable<Text>,
        captured_at -> Timestamptz,
        meta -> Jsonb,
    }
}

diesel::table! {
    zone_inspection_finding (finding_id) {
        finding_id -> Int4,
        inspection_id -> Int4,
        image_id -> Nullable<Int4>,
        tree_no -> Nullable<Int4>,
        nutrient_code -> Varchar,
        severity -> Varchar,
        confidence -> Float8,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    zone_inspection_recommendation (recommendation_id) {
        recommendation_id -> Int4,
        inspection_id -> Int4,
        fertilizer_id -> Nullable<Int4>,
        nutrient_code -> Nullable<Varchar>,
        recommendation_text -> Text,
        rate_per_area -> Nullable<Varchar>,
        application_method -> Nullable<Varchar>,
        status -> Varchar,
        applied_date -> Nullable<Date>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(field -> users (user_id));
diesel::joinable!(field_point -> field (field_id));
diesel::joinable!(zone -> field (field_id));
diesel::joinable!(mark_zone -> zone (zone_id));
diesel::joinable!(nutrient_deficiency -> fertilizer (fertilizer_id));
diesel::joinable!(zone_inspection -> field (field_id));
diesel::joinable!(zone_inspection -> zone (zone_id));
diesel::joinable!(zone_inspection_image -> zone_inspection (inspection_id));
diesel::joinable!(zone_inspection_finding -> zone_inspection (inspection_id));
diesel::joinable!(zone_inspection_recommendation -> zone_inspection (inspection_id));
diesel::joinable!(zone_inspection_recommendation -> fertilizer (fertilizer_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    field,
    field_point,
    zone,
    mark_zone,
    fertilizer,
    nutrient_deficiency,
    zone_inspection,
    zone_inspection_image,
    zone_inspection_finding,
    zone_inspection_recommendation,
);
