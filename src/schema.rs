// Database schema definitions
diesel::table! {
    departments (id) {
        id -> Int4,
        name -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    positions (id) {
        id -> Int4,
        name -> Varchar,
        is_leader -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    employees (id) {
        id -> Int4,
        ashima_id -> Varchar,
        name -> Varchar,
        department_id -> Nullable<Int4>,
        position_id -> Nullable<Int4>,
        supervisor_id -> Nullable<Varchar>,
        rfid_tag -> Nullable<Varchar>,
        photo -> Nullable<Bytea>,
        employment_type -> Varchar,
        status -> Varchar,
        last_active -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    attendance_logs (id) {
        id -> Int4,
        ashima_id -> Varchar,
        log_type -> Varchar,
        logged_at -> Timestamp,
    }
}

diesel::table! {
    admin_users (id) {
        id -> Int4,
        username -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        employee_id -> Nullable<Varchar>,
        last_login -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    role_permissions (role, module) {
        role -> Varchar,
        module -> Varchar,
        permission -> Jsonb,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(employees -> departments (department_id));
diesel::joinable!(employees -> positions (position_id));

diesel::allow_tables_to_appear_in_same_query!(
    departments, positions, employees,
    attendance_logs, admin_users, role_permissions,
);
