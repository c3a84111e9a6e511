//! Catalog of the block definitions the emitter places.
//!
//! Active blocks list `Before` first among their inputs and `After` first
//! among their outputs. Passive blocks backing built-ins list their inputs
//! and outputs in parameter order.

use crate::graph::{BlockDef, BlockKind, TerminalDef};
use crate::types::WireType;

macro_rules! terminals {
    ($($name:literal : $wire:ident),* $(,)?) => {
        &[$(TerminalDef { name: $name, wire: WireType::$wire }),*]
    };
}

macro_rules! block {
    ($ident:ident, $name:literal, $kind:ident, [$($iname:literal : $iwire:ident),* $(,)?], [$($oname:literal : $owire:ident),* $(,)?]) => {
        pub static $ident: BlockDef = BlockDef {
            name: $name,
            kind: BlockKind::$kind,
            inputs: terminals!($($iname : $iwire),*),
            outputs: terminals!($($oname : $owire),*),
        };
    };
}

// Values
block!(NUMBER, "Number", Value, [], ["Number": Float]);
block!(VECTOR, "Vector", Value, [], ["Vector": Vec3]);
block!(ROTATION, "Rotation", Value, [], ["Rotation": Rot]);
block!(TRUE, "True", Value, [], ["True": Bool]);
block!(FALSE, "False", Value, [], ["False": Bool]);
// Slot 0 holds the world position of the referenced block.
block!(BLOCK_REFERENCE, "Block Reference", Value, [], ["Object": Obj]);

// Variables: slot 0 of `Variable …` and `Set Variable …` holds the
// storage name.
block!(VARIABLE_NUMBER, "Variable Number", Value, [], ["Value": FloatPtr]);
block!(VARIABLE_VECTOR, "Variable Vector", Value, [], ["Value": Vec3Ptr]);
block!(VARIABLE_ROTATION, "Variable Rotation", Value, [], ["Value": RotPtr]);
block!(VARIABLE_TRUTH, "Variable Truth", Value, [], ["Value": BoolPtr]);
block!(VARIABLE_OBJECT, "Variable Object", Value, [], ["Value": ObjPtr]);

block!(SET_VARIABLE_NUMBER, "Set Variable Number", Active, ["Before": Void, "Value": Float], ["After": Void]);
block!(SET_VARIABLE_VECTOR, "Set Variable Vector", Active, ["Before": Void, "Value": Vec3], ["After": Void]);
block!(SET_VARIABLE_ROTATION, "Set Variable Rotation", Active, ["Before": Void, "Value": Rot], ["After": Void]);
block!(SET_VARIABLE_TRUTH, "Set Variable Truth", Active, ["Before": Void, "Value": Bool], ["After": Void]);
block!(SET_VARIABLE_OBJECT, "Set Variable Object", Active, ["Before": Void, "Value": Obj], ["After": Void]);

block!(SET_POINTER_NUMBER, "Set Pointer Number", Active, ["Before": Void, "Variable": FloatPtr, "Value": Float], ["After": Void]);
block!(SET_POINTER_VECTOR, "Set Pointer Vector", Active, ["Before": Void, "Variable": Vec3Ptr, "Value": Vec3], ["After": Void]);
block!(SET_POINTER_ROTATION, "Set Pointer Rotation", Active, ["Before": Void, "Variable": RotPtr, "Value": Rot], ["After": Void]);
block!(SET_POINTER_TRUTH, "Set Pointer Truth", Active, ["Before": Void, "Variable": BoolPtr, "Value": Bool], ["After": Void]);
block!(SET_POINTER_OBJECT, "Set Pointer Object", Active, ["Before": Void, "Variable": ObjPtr, "Value": Obj], ["After": Void]);

block!(LIST_NUMBER, "List Number", Passive, ["Variable": FloatPtr, "Index": Float], ["Element": FloatPtr]);
block!(LIST_VECTOR, "List Vector", Passive, ["Variable": Vec3Ptr, "Index": Float], ["Element": Vec3Ptr]);
block!(LIST_ROTATION, "List Rotation", Passive, ["Variable": RotPtr, "Index": Float], ["Element": RotPtr]);
block!(LIST_TRUTH, "List Truth", Passive, ["Variable": BoolPtr, "Index": Float], ["Element": BoolPtr]);
block!(LIST_OBJECT, "List Object", Passive, ["Variable": ObjPtr, "Index": Float], ["Element": ObjPtr]);

// Control
block!(IF, "If", Active, ["Before": Void, "Condition": Bool], ["After": Void, "True": Void, "False": Void]);
block!(PLAY_SENSOR, "Play Sensor", Active, ["Before": Void], ["After": Void, "On Play": Void]);
block!(LATE_UPDATE, "Late Update", Active, ["Before": Void], ["After": Void, "After Physics": Void]);
block!(BOX_ART_SENSOR, "Box Art Sensor", Active, ["Before": Void], ["After": Void, "On Screenshot": Void]);
// Slot 0: touch state, slot 1: finger index.
block!(TOUCH_SENSOR, "Touch Sensor", Active, ["Before": Void], ["After": Void, "Touched": Void, "Screen X": Float, "Screen Y": Float]);
block!(SWIPE_SENSOR, "Swipe Sensor", Active, ["Before": Void], ["After": Void, "Swiped": Void, "Direction": Vec3]);
// Slot 0: button type.
block!(BUTTON, "Button", Active, ["Before": Void], ["After": Void, "Button": Void]);

// Debugging and objects
block!(INSPECT_NUMBER, "Inspect Number", Active, ["Before": Void, "Number": Float], ["After": Void]);
block!(INSPECT_VECTOR, "Inspect Vector", Active, ["Before": Void, "Vector": Vec3], ["After": Void]);
block!(INSPECT_ROTATION, "Inspect Rotation", Active, ["Before": Void, "Rotation": Rot], ["After": Void]);
block!(INSPECT_TRUTH, "Inspect Truth", Active, ["Before": Void, "Truth": Bool], ["After": Void]);
block!(INSPECT_OBJECT, "Inspect Object", Active, ["Before": Void, "Object": Obj], ["After": Void]);
block!(SET_POSITION, "Set Position", Active, ["Before": Void, "Object": Obj, "Position": Vec3, "Rotation": Rot], ["After": Void]);
block!(GET_POSITION, "Get Position", Passive, ["Object": Obj], ["Position": Vec3, "Rotation": Rot]);
block!(RAYCAST, "Raycast", Passive, ["From": Vec3, "To": Vec3], ["Hit": Bool, "Hit Pos": Vec3, "Hit Obj": Obj]);
block!(SCREEN_SIZE, "Screen Size", Passive, [], ["Width": Float, "Height": Float]);
block!(CURRENT_FRAME, "Current Frame", Passive, [], ["Counter": Float]);

// Math
block!(NEGATE, "Negate", Passive, ["Num": Float], ["-Num": Float]);
block!(NOT, "Not", Passive, ["Tru": Bool], ["Not Tru": Bool]);
block!(ADD_NUMBERS, "Add Numbers", Passive, ["Num1": Float, "Num2": Float], ["Num1 + Num2": Float]);
block!(SUBTRACT_NUMBERS, "Subtract Numbers", Passive, ["Num1": Float, "Num2": Float], ["Num1 - Num2": Float]);
block!(MULTIPLY, "Multiply", Passive, ["Num1": Float, "Num2": Float], ["Num1 * Num2": Float]);
block!(DIVIDE, "Divide", Passive, ["Num1": Float, "Num2": Float], ["Num1 / Num2": Float]);
block!(MODULO, "Modulo", Passive, ["a": Float, "b": Float], ["mod(a,b)": Float]);
block!(POWER, "Power", Passive, ["Base": Float, "Exponent": Float], ["Base ^ Exponent": Float]);
block!(ADD_VECTORS, "Add Vectors", Passive, ["Vec1": Vec3, "Vec2": Vec3], ["Vec1 + Vec2": Vec3]);
block!(SUBTRACT_VECTORS, "Subtract Vectors", Passive, ["Vec1": Vec3, "Vec2": Vec3], ["Vec1 - Vec2": Vec3]);
block!(SCALE_VECTOR, "Scale Vector", Passive, ["Vec": Vec3, "Num": Float], ["Vec * Num": Vec3]);
block!(ROTATE_VECTOR, "Rotate Vector", Passive, ["Vec": Vec3, "Rot": Rot], ["Rot * Vec": Vec3]);
block!(COMBINE_ROTATIONS, "Combine Rotations", Passive, ["Rot1": Rot, "Rot2": Rot], ["Rot1 * Rot2": Rot]);
block!(LESS_THAN, "Less Than", Passive, ["Num1": Float, "Num2": Float], ["Num1 < Num2": Bool]);
block!(GREATER_THAN, "Greater Than", Passive, ["Num1": Float, "Num2": Float], ["Num1 > Num2": Bool]);
block!(EQUAL_NUMBERS, "Equal Numbers", Passive, ["Num1": Float, "Num2": Float], ["Num1 = Num2": Bool]);
block!(EQUAL_VECTORS, "Equal Vectors", Passive, ["Vec1": Vec3, "Vec2": Vec3], ["Vec1 = Vec2": Bool]);
block!(EQUAL_OBJECTS, "Equal Objects", Passive, ["Obj1": Obj, "Obj2": Obj], ["Obj1 = Obj2": Bool]);
block!(EQUAL_TRUTHS, "Equal Truths", Passive, ["Tru1": Bool, "Tru2": Bool], ["Tru1 = Tru2": Bool]);
block!(AND, "AND", Passive, ["Tru1": Bool, "Tru2": Bool], ["Tru1 & Tru2": Bool]);
block!(OR, "OR", Passive, ["Tru1": Bool, "Tru2": Bool], ["Tru1 | Tru2": Bool]);
block!(MAKE_VECTOR, "Make Vector", Passive, ["X": Float, "Y": Float, "Z": Float], ["Vector": Vec3]);
block!(BREAK_VECTOR, "Break Vector", Passive, ["Vector": Vec3], ["X": Float, "Y": Float, "Z": Float]);
block!(MAKE_ROTATION, "Make Rotation", Passive, ["X": Float, "Y": Float, "Z": Float], ["Rotation": Rot]);
block!(BREAK_ROTATION, "Break Rotation", Passive, ["Rotation": Rot], ["X": Float, "Y": Float, "Z": Float]);
block!(ABSOLUTE, "Absolute", Passive, ["Num": Float], ["|Num|": Float]);
block!(FLOOR, "Floor", Passive, ["Number": Float], ["Floor": Float]);
block!(CEILING, "Ceiling", Passive, ["Number": Float], ["Ceiling": Float]);
block!(ROUND, "Round", Passive, ["Number": Float], ["Rounded": Float]);
block!(MIN, "Min", Passive, ["Num1": Float, "Num2": Float], ["Min": Float]);
block!(MAX, "Max", Passive, ["Num1": Float, "Num2": Float], ["Max": Float]);
block!(RANDOM, "Random", Passive, ["Min": Float, "Max": Float], ["Random": Float]);
block!(DISTANCE, "Distance", Passive, ["Vector1": Vec3, "Vector2": Vec3], ["Distance": Float]);
block!(DOT_PRODUCT, "Dot Product", Passive, ["Vector1": Vec3, "Vector2": Vec3], ["Dot Product": Float]);
block!(CROSS_PRODUCT, "Cross Product", Passive, ["Vector1": Vec3, "Vector2": Vec3], ["Cross Product": Vec3]);

/// `Variable …` block for values travelling on `wire` (pointer or value).
pub fn variable(wire: WireType) -> Option<&'static BlockDef> {
    match wire.to_value() {
        WireType::Float => Some(&VARIABLE_NUMBER),
        WireType::Vec3 => Some(&VARIABLE_VECTOR),
        WireType::Rot => Some(&VARIABLE_ROTATION),
        WireType::Bool => Some(&VARIABLE_TRUTH),
        WireType::Obj => Some(&VARIABLE_OBJECT),
        _ => None,
    }
}

pub fn set_variable(wire: WireType) -> Option<&'static BlockDef> {
    match wire.to_value() {
        WireType::Float => Some(&SET_VARIABLE_NUMBER),
        WireType::Vec3 => Some(&SET_VARIABLE_VECTOR),
        WireType::Rot => Some(&SET_VARIABLE_ROTATION),
        WireType::Bool => Some(&SET_VARIABLE_TRUTH),
        WireType::Obj => Some(&SET_VARIABLE_OBJECT),
        _ => None,
    }
}

pub fn set_pointer(wire: WireType) -> Option<&'static BlockDef> {
    match wire.to_value() {
        WireType::Float => Some(&SET_POINTER_NUMBER),
        WireType::Vec3 => Some(&SET_POINTER_VECTOR),
        WireType::Rot => Some(&SET_POINTER_ROTATION),
        WireType::Bool => Some(&SET_POINTER_TRUTH),
        WireType::Obj => Some(&SET_POINTER_OBJECT),
        _ => None,
    }
}

pub fn list_element(wire: WireType) -> Option<&'static BlockDef> {
    match wire.to_value() {
        WireType::Float => Some(&LIST_NUMBER),
        WireType::Vec3 => Some(&LIST_VECTOR),
        WireType::Rot => Some(&LIST_ROTATION),
        WireType::Bool => Some(&LIST_TRUTH),
        WireType::Obj => Some(&LIST_OBJECT),
        _ => None,
    }
}

pub fn inspect(wire: WireType) -> Option<&'static BlockDef> {
    match wire.to_value() {
        WireType::Float => Some(&INSPECT_NUMBER),
        WireType::Vec3 => Some(&INSPECT_VECTOR),
        WireType::Rot => Some(&INSPECT_ROTATION),
        WireType::Bool => Some(&INSPECT_TRUTH),
        WireType::Obj => Some(&INSPECT_OBJECT),
        _ => None,
    }
}
