table! {
    assignments (id) {
        id -> Uuid,
        class_id -> Uuid,
        title -> Text,
        description -> Text,
        deadline -> Timestamp,
        rubric_id -> Nullable<Uuid>,
        created_at -> Timestamp,
    }
}

table! {
    class_members (class_id, student_id) {
        class_id -> Uuid,
        student_id -> Uuid,
        created_at -> Timestamp,
    }
}

table! {
    classes (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        code -> Text,
        teacher_id -> Uuid,
        created_at -> Timestamp,
    }
}

table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        kind -> Text,
        message -> Text,
        link -> Text,
        read -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    peer_review_selections (id) {
        id -> Uuid,
        peer_review_id -> Uuid,
        criterion_id -> Uuid,
        level_id -> Uuid,
    }
}

table! {
    peer_reviews (id) {
        id -> Uuid,
        submission_id -> Uuid,
        reviewer_id -> Uuid,
        deadline -> Timestamp,
        comments -> Nullable<Text>,
        status -> Text,
        created_at -> Timestamp,
    }
}

table! {
    rubric_criteria (id) {
        id -> Uuid,
        rubric_id -> Uuid,
        title -> Text,
        position -> Int4,
    }
}

table! {
    rubric_levels (id) {
        id -> Uuid,
        criterion_id -> Uuid,
        name -> Text,
        score -> Int4,
        description -> Text,
        position -> Int4,
    }
}

table! {
    rubrics (id) {
        id -> Uuid,
        name -> Text,
        teacher_id -> Uuid,
        created_at -> Timestamp,
    }
}

table! {
    submission_files (id) {
        id -> Uuid,
        submission_id -> Uuid,
        file_name -> Text,
        stored_name -> Text,
    }
}

table! {
    submissions (id) {
        id -> Uuid,
        assignment_id -> Uuid,
        student_id -> Uuid,
        content -> Text,
        submitted_at -> Timestamp,
        score -> Nullable<Int4>,
        teacher_comment -> Nullable<Text>,
    }
}

table! {
    users (id) {
        id -> Uuid,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        password -> Text,
        role -> Text,
        created_at -> Timestamp,
    }
}

joinable!(assignments -> classes (class_id));
joinable!(assignments -> rubrics (rubric_id));
joinable!(class_members -> classes (class_id));
joinable!(class_members -> users (student_id));
joinable!(classes -> users (teacher_id));
joinable!(notifications -> users (user_id));
joinable!(peer_review_selections -> peer_reviews (peer_review_id));
joinable!(peer_review_selections -> rubric_criteria (criterion_id));
joinable!(peer_review_selections -> rubric_levels (level_id));
joinable!(peer_reviews -> submissions (submission_id));
joinable!(peer_reviews -> users (reviewer_id));
joinable!(rubric_criteria -> rubrics (rubric_id));
joinable!(rubric_levels -> rubric_criteria (criterion_id));
joinable!(rubrics -> users (teacher_id));
joinable!(submission_files -> submissions (submission_id));
joinable!(submissions -> assignments (assignment_id));
joinable!(submissions -> users (student_id));

allow_tables_to_appear_in_same_query!(
    assignments,
    class_members,
    classes,
    notifications,
    peer_review_selections,
    peer_reviews,
    rubric_criteria,
    rubric_levels,
    rubrics,
    submission_files,
    submissions,
    users,
);
