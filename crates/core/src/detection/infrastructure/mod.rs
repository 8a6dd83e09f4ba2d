pub mod onnx_yolo_locator;
