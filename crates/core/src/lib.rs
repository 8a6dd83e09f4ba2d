pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod embedding;
    pub mod frame;
    pub mod model_resolver;
    pub mod onnx_session;
}

pub mod detection {
    pub mod domain {
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod recognition {
    pub mod domain {
        pub mod attribute_estimator;
        pub mod descriptor_store;
        pub mod detected_face;
        pub mod face_analyzer;
        pub mod face_embedder;
        pub mod face_matcher;
        pub mod recognition_state;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod presentation {
    pub mod domain {
        pub mod detection_sink;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detect_faces_use_case;
    pub mod detection_loop;
    pub mod infrastructure;
    pub mod register_face_use_case;
    pub mod tick_scheduler;
}
