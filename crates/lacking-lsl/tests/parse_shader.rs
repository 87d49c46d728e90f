// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use lacking_lsl::ast::{
    AssignmentOperator, BlockKind, Declaration, Expression, Statement,
};
use lacking_lsl::{parse, parse_and_validate, parse_bytes, Error, Schema, TokenKind, Tokenizer};

const PBR_SHADER: &str = r#"
// Material inputs
textures {
  albedoTwoSidedTexture sampler2D
  normalTexture sampler2D,
}

uniforms {
  albedoColor vec4
  metallic float, roughness float
}

varyings {
  uv vec2
}

func #vertex() {
  #uv = #texCoord
}

func #fragment() {
  var color vec4 = sample(albedoTwoSidedTexture, #uv) * albedoColor
  if color.a < 0.5 {
    discard
  } else if color.a < 0.9 {
    color.a = 1.0
  } else {
    color *= 2
  }
  #color = color // written out
}
"#;

#[test]
fn parses_a_complete_material_shader() {
    let shader = parse(PBR_SHADER).unwrap();

    let textures = shader.texture_block().unwrap();
    assert_eq!(textures.kind, BlockKind::Textures);
    let names: Vec<_> = textures.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["albedoTwoSidedTexture", "normalTexture"]);

    let uniforms = shader.uniform_block().unwrap();
    let fields: Vec<_> = uniforms
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.type_name.as_str()))
        .collect();
    assert_eq!(
        fields,
        [("albedoColor", "vec4"), ("metallic", "float"), ("roughness", "float")]
    );

    let functions: Vec<_> = shader.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(functions, ["#vertex", "#fragment"]);

    let fragment = shader.find_function("#fragment").unwrap();
    assert_eq!(fragment.body.len(), 3);
    match &fragment.body[1] {
        Statement::Conditional(conditional) => {
            assert_eq!(conditional.then_body, vec![Statement::Discard]);
            assert_eq!(conditional.else_ifs.len(), 1);
            let else_body = conditional.else_body.as_ref().unwrap();
            assert!(matches!(
                else_body[0],
                Statement::Assignment {
                    operator: AssignmentOperator::Multiply,
                    ..
                }
            ));
        }
        other => panic!("expected a conditional, got {other:?}"),
    }

    parse_and_validate(PBR_SHADER, &Schema::geometry()).unwrap();
}

#[test]
fn uniform_block_round_trip() {
    let shader = parse("uniforms { color vec4\n intensity float\n}").unwrap();
    assert_eq!(shader.declarations.len(), 1);
    let Declaration::Block(block) = &shader.declarations[0] else {
        panic!("expected a block declaration");
    };
    assert_eq!(block.kind, BlockKind::Uniforms);
    let fields: Vec<_> = block
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.type_name.as_str()))
        .collect();
    assert_eq!(fields, [("color", "vec4"), ("intensity", "float")]);
}

#[test]
fn comments_and_newlines_only_give_an_empty_shader() {
    let shader = parse("\n// nothing here\n\n   // still nothing\n").unwrap();
    assert!(shader.declarations.is_empty());
}

#[test]
fn functions_with_inputs_and_outputs() {
    let shader = parse(
        "func blend(a vec4,\n b vec4) (result vec4) {\n result = mix(a, b, 0.5)\n}",
    )
    .unwrap();
    let function = shader.find_function("blend").unwrap();
    assert_eq!(function.inputs.len(), 2);
    assert_eq!(function.outputs[0].name, "result");
    assert!(matches!(
        &function.body[0],
        Statement::Assignment { expression: Expression::FunctionCall(call), .. } if call.name == "mix"
    ));
}

#[test]
fn invalid_utf8_is_reported() {
    let tokens: Vec<_> = Tokenizer::from_bytes(&[b'a', 0xC3, 0x28]).collect();
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::Error).count(),
        1
    );
    assert!(matches!(
        parse_bytes(&[b'a', 0xC3, 0x28]),
        Err(Error::InvalidEncoding { .. })
    ));
}

#[test]
fn syntax_errors_carry_positions() {
    let err = parse("func main() {\n  var x float = \n}").unwrap_err();
    assert_eq!(err.position().line, 2);
    assert!(err.to_string().starts_with("2:"));
}
